pub mod resume;
pub mod subscription;
