pub mod audio_file;
pub mod enrichment;
pub mod job;
pub mod notation;
pub mod video;

pub use audio_file::AudioFileRepository;
pub use enrichment::EnrichmentRepository;
pub use job::JobRepository;
pub use notation::NotationRepository;
pub use video::VideoRepository;
