mod media_source;
mod sample_track_source;

pub use media_source::*;
pub use sample_track_source::*;
