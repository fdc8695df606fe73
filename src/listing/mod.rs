//! Pure listing core: schema, formatting, caption rendering and pricing.

pub mod caption;
pub mod deeplink;
pub mod draft;
pub mod format;
pub mod model;
pub mod pricing;
pub mod schema;

pub use caption::CaptionContext;
pub use draft::ListingDraft;
pub use model::DealType;
pub use model::Field;
pub use model::ListingRecord;
pub use model::MediaRef;
pub use model::PropertyType;
