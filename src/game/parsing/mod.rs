pub mod chroma;
pub mod embedded;
