pub mod advertising;
pub mod constants;
pub mod types;

pub use advertising::{
    parse_advertising_data, AdvertisingConfigurator, AdvertisingData, AdvertisingInfo,
};
pub use constants::*;
pub use types::*;
