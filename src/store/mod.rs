//! Action history sinks

pub mod action_log;
pub mod supabase;

pub use action_log::{ActionLog, ActionLogError};
pub use supabase::SupabaseClient;
