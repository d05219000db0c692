pub mod record;
pub mod sheets;
