pub mod kv;
pub mod via;
