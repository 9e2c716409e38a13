pub mod image_service;
pub mod labels;
pub mod preprocess;
pub mod storage;
