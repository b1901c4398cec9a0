pub mod supabase;
pub mod util;

pub use supabase::SupabaseClient;
