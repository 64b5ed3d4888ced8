use std::{fmt, str::FromStr};

/// Identifier for every solving strategy the engine knows, plus the terminal
/// backtracking fallback.
///
/// Each kind carries a difficulty rank from 1 (singles) to 9 (backtracking);
/// the hardest rank a puzzle requires is its difficulty level. The textual
/// form of a kind is its lowercase alphanumeric token (`"nakedsingle"`,
/// `"xwing"`, `"patternoverlaymethod"`, ...), used in output lines and
/// command-line options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[expect(missing_docs)]
pub enum StrategyKind {
    NakedSingle,
    HiddenSingle,
    PointingPairs,
    BoxLineReduction,
    NakedPair,
    HiddenPair,
    NakedTriple,
    HiddenTriple,
    NakedQuad,
    HiddenQuad,
    XWing,
    YWing,
    Skyscraper,
    TwoStringKite,
    EmptyRectangle,
    RemotePairs,
    Swordfish,
    XyzWing,
    FinnedXWingSashimi,
    UniqueRectangle,
    BugPlusOne,
    WWing,
    SimpleColoring,
    Jellyfish,
    WxyzWing,
    FinnedSwordfish,
    FinnedJellyfish,
    XChain,
    XyChain,
    AlsXz,
    UniqueLoop,
    AvoidableRectangle,
    BivalueOddagon,
    Medusa3D,
    Aic,
    GroupedAic,
    GroupedXCycle,
    ContinuousNiceLoop,
    AlsXyWing,
    AlsChain,
    SueDeCoq,
    DeathBlossom,
    FrankenFish,
    MutantFish,
    KrakenFish,
    Msls,
    Exocet,
    SeniorExocet,
    SkLoop,
    PatternOverlayMethod,
    ForcingChains,
    Backtracking,
}

impl StrategyKind {
    /// Every kind, ordered by rank and then by registry position.
    pub const ALL: [Self; 52] = [
        Self::NakedSingle,
        Self::HiddenSingle,
        Self::PointingPairs,
        Self::BoxLineReduction,
        Self::NakedPair,
        Self::HiddenPair,
        Self::NakedTriple,
        Self::HiddenTriple,
        Self::NakedQuad,
        Self::HiddenQuad,
        Self::XWing,
        Self::YWing,
        Self::Skyscraper,
        Self::TwoStringKite,
        Self::EmptyRectangle,
        Self::RemotePairs,
        Self::Swordfish,
        Self::XyzWing,
        Self::FinnedXWingSashimi,
        Self::UniqueRectangle,
        Self::BugPlusOne,
        Self::WWing,
        Self::SimpleColoring,
        Self::Jellyfish,
        Self::WxyzWing,
        Self::FinnedSwordfish,
        Self::FinnedJellyfish,
        Self::XChain,
        Self::XyChain,
        Self::AlsXz,
        Self::UniqueLoop,
        Self::AvoidableRectangle,
        Self::BivalueOddagon,
        Self::Medusa3D,
        Self::Aic,
        Self::GroupedAic,
        Self::GroupedXCycle,
        Self::ContinuousNiceLoop,
        Self::AlsXyWing,
        Self::AlsChain,
        Self::SueDeCoq,
        Self::DeathBlossom,
        Self::FrankenFish,
        Self::MutantFish,
        Self::KrakenFish,
        Self::Msls,
        Self::Exocet,
        Self::SeniorExocet,
        Self::SkLoop,
        Self::PatternOverlayMethod,
        Self::ForcingChains,
        Self::Backtracking,
    ];

    /// Difficulty rank of the strategy, 1 through 9.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::NakedSingle | Self::HiddenSingle => 1,
            Self::PointingPairs | Self::BoxLineReduction => 2,
            Self::NakedPair | Self::HiddenPair | Self::NakedTriple | Self::HiddenTriple => 3,
            Self::NakedQuad
            | Self::HiddenQuad
            | Self::XWing
            | Self::YWing
            | Self::Skyscraper
            | Self::TwoStringKite
            | Self::EmptyRectangle
            | Self::RemotePairs => 4,
            Self::Swordfish
            | Self::XyzWing
            | Self::FinnedXWingSashimi
            | Self::UniqueRectangle
            | Self::BugPlusOne
            | Self::WWing
            | Self::SimpleColoring => 5,
            Self::Jellyfish
            | Self::WxyzWing
            | Self::FinnedSwordfish
            | Self::FinnedJellyfish
            | Self::XChain
            | Self::XyChain
            | Self::AlsXz
            | Self::UniqueLoop
            | Self::AvoidableRectangle
            | Self::BivalueOddagon => 6,
            Self::Medusa3D
            | Self::Aic
            | Self::GroupedAic
            | Self::GroupedXCycle
            | Self::ContinuousNiceLoop
            | Self::AlsXyWing
            | Self::AlsChain
            | Self::SueDeCoq
            | Self::DeathBlossom
            | Self::FrankenFish
            | Self::MutantFish
            | Self::KrakenFish => 7,
            Self::Msls
            | Self::Exocet
            | Self::SeniorExocet
            | Self::SkLoop
            | Self::PatternOverlayMethod
            | Self::ForcingChains => 8,
            Self::Backtracking => 9,
        }
    }

    /// Lowercase alphanumeric token of the strategy.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::NakedSingle => "nakedsingle",
            Self::HiddenSingle => "hiddensingle",
            Self::PointingPairs => "pointingpairs",
            Self::BoxLineReduction => "boxlinereduction",
            Self::NakedPair => "nakedpair",
            Self::HiddenPair => "hiddenpair",
            Self::NakedTriple => "nakedtriple",
            Self::HiddenTriple => "hiddentriple",
            Self::NakedQuad => "nakedquad",
            Self::HiddenQuad => "hiddenquad",
            Self::XWing => "xwing",
            Self::YWing => "ywing",
            Self::Skyscraper => "skyscraper",
            Self::TwoStringKite => "twostringkite",
            Self::EmptyRectangle => "emptyrectangle",
            Self::RemotePairs => "remotepairs",
            Self::Swordfish => "swordfish",
            Self::XyzWing => "xyzwing",
            Self::FinnedXWingSashimi => "finnedxwingsashimi",
            Self::UniqueRectangle => "uniquerectangle",
            Self::BugPlusOne => "bugplusone",
            Self::WWing => "wwing",
            Self::SimpleColoring => "simplecoloring",
            Self::Jellyfish => "jellyfish",
            Self::WxyzWing => "wxyzwing",
            Self::FinnedSwordfish => "finnedswordfish",
            Self::FinnedJellyfish => "finnedjellyfish",
            Self::XChain => "xchain",
            Self::XyChain => "xychain",
            Self::AlsXz => "alsxz",
            Self::UniqueLoop => "uniqueloop",
            Self::AvoidableRectangle => "avoidablerectangle",
            Self::BivalueOddagon => "bivalueoddagon",
            Self::Medusa3D => "medusa3d",
            Self::Aic => "aic",
            Self::GroupedAic => "groupedaic",
            Self::GroupedXCycle => "groupedxcycle",
            Self::ContinuousNiceLoop => "continuousniceloop",
            Self::AlsXyWing => "alsxywing",
            Self::AlsChain => "alschain",
            Self::SueDeCoq => "suedecoq",
            Self::DeathBlossom => "deathblossom",
            Self::FrankenFish => "frankenfish",
            Self::MutantFish => "mutantfish",
            Self::KrakenFish => "krakenfish",
            Self::Msls => "msls",
            Self::Exocet => "exocet",
            Self::SeniorExocet => "seniorexocet",
            Self::SkLoop => "skloop",
            Self::PatternOverlayMethod => "patternoverlaymethod",
            Self::ForcingChains => "forcingchains",
            Self::Backtracking => "backtracking",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    /// Parses a kind from its token, ignoring case and non-alphanumerics
    /// (`"X-Wing"`, `"x_wing"` and `"xwing"` all parse).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        if key == "bruteforce" {
            return Ok(Self::Backtracking);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.token() == key)
            .ok_or_else(|| format!("unknown strategy `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_roundtrip() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.token().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!("X-Wing".parse::<StrategyKind>().unwrap(), StrategyKind::XWing);
        assert_eq!(
            "Unique Rectangle".parse::<StrategyKind>().unwrap(),
            StrategyKind::UniqueRectangle
        );
        assert_eq!(
            "bruteforce".parse::<StrategyKind>().unwrap(),
            StrategyKind::Backtracking
        );
        assert!("no-such-strategy".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_ranks_are_monotonic_over_registry_order() {
        let mut last = 0;
        for kind in StrategyKind::ALL {
            assert!(kind.rank() >= last, "{kind} breaks rank ordering");
            last = kind.rank();
        }
        assert_eq!(StrategyKind::NakedSingle.rank(), 1);
        assert_eq!(StrategyKind::Backtracking.rank(), 9);
    }
}
