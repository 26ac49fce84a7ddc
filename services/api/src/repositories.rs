//! Repositories for database operations

pub mod device;
pub mod reading;

pub use device::DeviceRepository;
pub use reading::ReadingRepository;
