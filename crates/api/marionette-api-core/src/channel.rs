//! Semantic channel vocabulary.
//!
//! Puppet assets name the same semantic axis differently depending on the authoring tool and
//! its version (`ParamAngleX` vs `PARAM_ANGLE_X`, `ParamHairSide` standing in for cloth, ...).
//! Layers address a [`Channel`] and the table access helpers try each alias in order.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    EyeBallX,
    EyeBallY,
    AngleX,
    AngleY,
    BodyAngleX,
    BodyAngleY,
    ClothX,
    ClothY,
    Breath,
    ArmSway,
    EyeLOpen,
    EyeROpen,
    BrowLY,
    BrowRY,
    MouthOpenY,
}

impl Channel {
    pub const ALL: [Channel; 15] = [
        Channel::EyeBallX,
        Channel::EyeBallY,
        Channel::AngleX,
        Channel::AngleY,
        Channel::BodyAngleX,
        Channel::BodyAngleY,
        Channel::ClothX,
        Channel::ClothY,
        Channel::Breath,
        Channel::ArmSway,
        Channel::EyeLOpen,
        Channel::EyeROpen,
        Channel::BrowLY,
        Channel::BrowRY,
        Channel::MouthOpenY,
    ];

    /// Raw parameter ids this axis may carry, in resolution order.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Channel::EyeBallX => &["ParamEyeBallX", "PARAM_EYE_BALL_X"],
            Channel::EyeBallY => &["ParamEyeBallY", "PARAM_EYE_BALL_Y"],
            Channel::AngleX => &["ParamAngleX", "PARAM_ANGLE_X"],
            Channel::AngleY => &["ParamAngleY", "PARAM_ANGLE_Y"],
            Channel::BodyAngleX => &["ParamBodyAngleX", "PARAM_BODY_ANGLE_X", "ParamBodyX"],
            Channel::BodyAngleY => &["ParamBodyAngleY", "PARAM_BODY_ANGLE_Y", "ParamBodyY"],
            Channel::ClothX => &[
                "ParamClothX",
                "ParamSkirtX",
                "ParamHairSide",
                "PARAM_HAIR_SIDE",
            ],
            Channel::ClothY => &[
                "ParamClothY",
                "ParamSkirtY",
                "ParamHairBack",
                "PARAM_HAIR_BACK",
            ],
            Channel::Breath => &["ParamBreath", "PARAM_BREATH"],
            Channel::ArmSway => &["ParamArmSway", "ParamArmLA", "PARAM_ARM_L_A"],
            Channel::EyeLOpen => &["ParamEyeLOpen", "PARAM_EYE_L_OPEN"],
            Channel::EyeROpen => &["ParamEyeROpen", "PARAM_EYE_R_OPEN"],
            Channel::BrowLY => &["ParamBrowLY", "PARAM_BROW_L_Y"],
            Channel::BrowRY => &["ParamBrowRY", "PARAM_BROW_R_Y"],
            Channel::MouthOpenY => &["ParamMouthOpenY", "PARAM_MOUTH_OPEN_Y"],
        }
    }

    /// Stable snake_case name (matches the serde representation).
    pub fn name(self) -> &'static str {
        match self {
            Channel::EyeBallX => "eye_ball_x",
            Channel::EyeBallY => "eye_ball_y",
            Channel::AngleX => "angle_x",
            Channel::AngleY => "angle_y",
            Channel::BodyAngleX => "body_angle_x",
            Channel::BodyAngleY => "body_angle_y",
            Channel::ClothX => "cloth_x",
            Channel::ClothY => "cloth_y",
            Channel::Breath => "breath",
            Channel::ArmSway => "arm_sway",
            Channel::EyeLOpen => "eye_l_open",
            Channel::EyeROpen => "eye_r_open",
            Channel::BrowLY => "brow_l_y",
            Channel::BrowRY => "brow_r_y",
            Channel::MouthOpenY => "mouth_open_y",
        }
    }

    /// Reverse lookup of a raw parameter id to its semantic axis.
    pub fn from_alias(id: &str) -> Option<Channel> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.aliases().contains(&id))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_unique_across_channels() {
        let mut seen = std::collections::HashSet::new();
        for ch in Channel::ALL {
            for alias in ch.aliases() {
                assert!(seen.insert(*alias), "alias {alias} claimed twice");
            }
        }
    }

    #[test]
    fn from_alias_finds_legacy_names() {
        assert_eq!(Channel::from_alias("PARAM_ANGLE_X"), Some(Channel::AngleX));
        assert_eq!(Channel::from_alias("ParamHairSide"), Some(Channel::ClothX));
        assert_eq!(Channel::from_alias("ParamUnknown"), None);
    }

    #[test]
    fn serde_name_matches_name() {
        for ch in Channel::ALL {
            let s = serde_json::to_string(&ch).unwrap();
            assert_eq!(s, format!("\"{}\"", ch.name()));
        }
    }
}
