pub mod clock;
pub mod identity;
pub mod imaging;
pub mod storage;
