pub mod database;
pub mod labeling;
pub mod storage;
