pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod feedback;
pub mod geometry;
pub mod lifecycle;
pub mod mapper;
pub mod script;
pub mod session;
pub mod settings;
pub mod source;
pub mod input {
    pub mod capture;
    pub mod gesture;
    pub mod router;
}
pub mod processing {
    pub mod compositor;
    pub mod resample;
    pub mod sampler;
    pub mod surface;
}
pub mod tasks {
    pub mod replay;
    pub mod session;
}
