//! Name-based channel classification.
//!
//! A priority-ordered table of case-insensitive patterns covering the
//! names engineers actually type on console scribble strips. First
//! match wins.

use regex::Regex;

use super::profile::{Confidence, Role};

struct Rule {
    pattern: Regex,
    role: Role,
    group: &'static str,
    confidence: Confidence,
}

/// Outcome of classifying a channel name.
#[derive(Debug, Clone, PartialEq)]
pub struct NameClassification {
    pub role: Role,
    pub group: String,
    pub confidence: Confidence,
}

pub struct NameClassifier {
    rules: Vec<Rule>,
}

impl NameClassifier {
    pub fn new() -> Self {
        let mut rules = Vec::new();
        let mut add = |pattern: &str, role: Role, group: &'static str, confidence: Confidence| {
            let pattern = Regex::new(&format!("(?i){}", pattern))
                .expect("invalid name classifier pattern");
            rules.push(Rule { pattern, role, group, confidence });
        };

        use Confidence::{High, Low, Medium};

        // Drums
        add(r"^k(ic)?k$|bd|bass.?drum", Role::Kick, "drums", High);
        add(r"^sn(are)?$|snr", Role::Snare, "drums", High);
        add(r"h\.?h|hi.?hat|hihat|hh", Role::HiHat, "drums", High);
        add(r"^tom\s*[1-4]?$|^t[1-4]$|rack.?tom|floor.?tom", Role::Tom, "drums", High);
        add(r"^oh$|over.?head|cym(bal)?", Role::Overhead, "drums", High);
        add(r"room|amb(ience)?|kit.?mic", Role::RoomMic, "drums", High);

        // Bass
        add(r"^bass?\s*(d\.?i\.?|direct)?$|b\.d\.i\.?|bgtr", Role::BassGuitar, "bass", High);
        add(r"bass.?amp|b\.?amp", Role::BassAmp, "bass", High);

        // Guitars
        add(r"^e\.?gtr|elec.?git|e\.?guitar|^gtr\s*[lr12]?$", Role::ElectricGuitar, "guitars", High);
        add(r"ac.?git|acoustic|a\.?gtr", Role::AcousticGuitar, "guitars", High);

        // Keys
        add(r"^pno$|piano|grand", Role::Piano, "keys", High);
        add(r"^keys?\s*[lr12]?$|keyboard", Role::Keys, "keys", High);
        add(r"organ|b3|hammond", Role::Organ, "keys", High);
        add(r"synth|moog|arp|poly|pad|seq", Role::Synth, "keys", High);

        // Vocals
        add(
            r"^(lead\s*)?vox\s*(l|r|lr|1|2)?$|^(lead\s*)?vocal|^lv$|^ld\.?vx",
            Role::LeadVocal,
            "vocals",
            High,
        );
        add(
            r"^bv\s*[1-4lr]?$|b\.?v\.|back.?voc|backing|harmony|bg\.?voc",
            Role::BackingVocal,
            "vocals",
            High,
        );
        add(r"choir|chorus", Role::Choir, "vocals", High);
        add(r"presenter|speaker|announce|mc$|host", Role::Presenter, "vocals", High);
        add(r"talk.?back|^tb$|comm", Role::Talkback, "talkback", High);

        // Brass / strings
        add(r"tpt|trumpet|trp", Role::Trumpet, "brass", High);
        add(r"sax|alto|tenor|bari", Role::Saxophone, "brass", High);
        add(r"vln|violin|fiddle", Role::Violin, "strings", High);
        add(r"cello|vcl", Role::Cello, "strings", High);

        // Playback / FX
        add(r"playback|track[s]?|click|backing.?track|^bt$", Role::Playback, "playback", High);
        add(r"^fx\s*ret|return|rev.?return|delay.?ret", Role::FxReturn, "fx", High);
        add(r"^d\.?i\.?$|direct", Role::Di, "misc", Medium);

        // Generic console defaults: name tells us nothing
        add(r"^ch\s*\d+$|^input\s*\d+$|^mic\s*\d+$|^\d+$", Role::Unknown, "unknown", Low);

        Self { rules }
    }

    pub fn classify(&self, name: &str) -> NameClassification {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return NameClassification {
                role: Role::Unknown,
                group: "unknown".into(),
                confidence: Confidence::Unknown,
            };
        }

        for rule in &self.rules {
            if rule.pattern.is_match(trimmed) {
                return NameClassification {
                    role: rule.role,
                    group: rule.group.into(),
                    confidence: rule.confidence,
                };
            }
        }

        // Custom name we don't recognize: worth a spectral second opinion
        NameClassification {
            role: Role::Unknown,
            group: "unknown".into(),
            confidence: Confidence::Low,
        }
    }
}

impl Default for NameClassifier {
    fn default() -> Self {
        Self::new()
    }
}
