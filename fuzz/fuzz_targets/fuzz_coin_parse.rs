//! Fuzz target for amount and coin parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use seda_bootstrap::{Amount, Coin};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(amount) = s.parse::<Amount>() {
        // Accepted amounts print back without leading zeros.
        let printed = amount.to_string();
        assert_eq!(printed.trim_start_matches('0'), s.trim_start_matches('0'));
    }

    if let Ok(coin) = s.parse::<Coin>() {
        assert!(!coin.denom.is_empty());
        assert!(!coin.denom.starts_with(|c: char| c.is_ascii_digit()));
        let reparsed: Coin = coin.to_string().parse().expect("coin display reparses");
        assert_eq!(reparsed, coin);
    }
});
