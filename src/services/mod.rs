pub mod encryption;
pub mod extractor;
pub mod matcher;
pub mod parse_job;
pub mod parser;
pub mod queue;
pub mod review;
pub mod storage;
pub mod worker;
