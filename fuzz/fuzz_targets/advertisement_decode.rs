//! Fuzz target for manufacturer-data framing
//!
//! Raw manufacturer data goes through the same path a scanner uses: unframe,
//! then decode the payload under the company id it claims.

#![no_main]

use beacon_proto::{Advertisement, Packet};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(advert) = Advertisement::from_manufacturer_data(data) else {
        return;
    };
    assert_eq!(&advert.to_manufacturer_data()[..], data);

    let _ = Packet::from_advertisement(&advert, advert.company_id);
});
