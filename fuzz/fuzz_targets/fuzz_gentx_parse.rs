//! Fuzz target for gentx decoding.
//!
//! Arbitrary bytes must decode or fail cleanly, and anything that decodes
//! must survive the validation checks without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use seda_bootstrap::validation::check_gentx;
use seda_bootstrap::{AddressCodec, GentxFile, ValidationRules};

fuzz_target!(|data: &[u8]| {
    let Ok(file) = GentxFile::from_bytes("fuzz.json", data.to_vec()) else {
        return;
    };

    // Staging copies the original bytes, never a re-serialization.
    assert_eq!(file.contents, data);

    let rules = ValidationRules {
        denom: "aseda".to_string(),
        max_bond: "600000000000000000000000000000000000"
            .parse()
            .expect("valid ceiling"),
        codec: AddressCodec::new("seda"),
    };
    if let Ok(checked) = check_gentx(file, &rules) {
        assert_eq!(checked.stake.denom, rules.denom);
        assert!(checked.stake.amount <= rules.max_bond);
        assert!(checked.account_address.starts_with("seda1"));
    }
});
