//! Mid/side gain linking along a constant-power style pan law.
//!
//! `side = cos(θ)^e`, `mid = sin(θ)^e` for θ in [0, π/2]. Given one gain the
//! other follows by solving for θ. Results are clamped to the gain parameter
//! range.

use crate::dsp::utils::{db_to_gain, gain_to_db};

/// Pan-law exponent: a 4.5 dB centre drop instead of the 3.01 dB of a plain
/// sine/cosine law.
pub const PAN_LAW_EXPONENT: f32 = 4.5 / 3.01;

pub const LINK_MIN_DB: f32 = -32.0;
pub const LINK_MAX_DB: f32 = 3.0;

fn partner_gain(gain: f32) -> f32 {
    let g = gain.clamp(0.0, 1.0);
    let e = PAN_LAW_EXPONENT;
    // g = cos(θ)^e  =>  cos²θ = g^(2/e)  =>  partner = (1 - cos²θ)^(e/2)
    let cos_sq = g.powf(2.0 / e);
    (1.0 - cos_sq).max(0.0).powf(e * 0.5)
}

fn partner_db(db: f32) -> f32 {
    gain_to_db(partner_gain(db_to_gain(db))).clamp(LINK_MIN_DB, LINK_MAX_DB)
}

/// Mid gain that pairs with `side_db` on the pan law.
pub fn linked_mid_gain_db(side_db: f32) -> f32 {
    partner_db(side_db)
}

/// Side gain that pairs with `mid_db` on the pan law.
pub fn linked_side_gain_db(mid_db: f32) -> f32 {
    partner_db(mid_db)
}
