/// Floor used when converting silent levels to dB.
pub const DB_FLOOR: f32 = -120.0;

pub fn db_to_gain(db: f32) -> f32 {
    (10.0f32).powf(db / 20.0)
}

pub fn gain_to_db(gain: f32) -> f32 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(DB_FLOOR)
    } else {
        DB_FLOOR
    }
}

pub fn frame_rms(x: &[f32]) -> f32 {
    let mut s = 0.0f32;
    for &v in x {
        s += v * v;
    }
    (s / (x.len().max(1) as f32)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_round_trip() {
        for db in [-32.0f32, -6.0, 0.0, 3.0] {
            assert!((gain_to_db(db_to_gain(db)) - db).abs() < 1e-4);
        }
    }

    #[test]
    fn test_silence_floors() {
        assert_eq!(gain_to_db(0.0), DB_FLOOR);
        assert_eq!(frame_rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_of_constant() {
        let x = [0.5f32; 64];
        assert!((frame_rms(&x) - 0.5).abs() < 1e-6);
    }
}
