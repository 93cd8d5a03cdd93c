// File access: key decoding + ownership policy, the read gateway behind
// GET /files/*key, and the upload path that writes user files.

pub mod gateway;
pub mod handlers;
pub mod key;
pub mod upload;
