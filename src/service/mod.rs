pub mod inquiries;
pub mod listings;
#[cfg(test)]
pub mod memory;
pub mod ports;

pub use inquiries::InquiryService;
pub use listings::ListingService;
pub use listings::RepostOutcome;
