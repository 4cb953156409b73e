pub mod aws;
pub mod queue;
pub mod storage;
pub mod transcode;
