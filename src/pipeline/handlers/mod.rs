pub mod media_download;

pub use media_download::MediaDownloadHandler;
