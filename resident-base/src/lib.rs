pub mod hashing;

mod asset_path;
mod resolved_object;
mod tag;

pub use asset_path::AssetPath;
pub use resolved_object::ResidentAsset;
pub use resolved_object::ResolvedObject;
pub use tag::Tag;

pub mod handle;
pub use handle::HandleStatus;
pub use handle::LoadHandle;
