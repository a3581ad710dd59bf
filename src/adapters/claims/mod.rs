pub mod redis_mirror;
