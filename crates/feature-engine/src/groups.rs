//! Spectral Channel Group Detection

use serde::{Deserialize, Serialize};

/// Kind of spectral reading a channel column carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelGroup {
    /// Raw sensor intensity
    Raw,
    /// Reflectance percentage
    Reflectance,
    /// Absorbance
    Absorbance,
}

impl ChannelGroup {
    /// All groups in canonical order
    pub const ALL: [ChannelGroup; 3] = [
        ChannelGroup::Raw,
        ChannelGroup::Reflectance,
        ChannelGroup::Absorbance,
    ];

    /// Column-name prefix, followed by the channel number
    pub fn prefix(&self) -> &'static str {
        match self {
            ChannelGroup::Raw => "raw_ch",
            ChannelGroup::Reflectance => "reflect_ch",
            ChannelGroup::Absorbance => "absorb_ch",
        }
    }

    /// Channel number encoded in a column name, if it belongs to this group
    pub fn channel_number(&self, column: &str) -> Option<u32> {
        let digits = column.strip_prefix(self.prefix())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// One detected channel column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Channel number from the column suffix
    pub number: u32,
    /// Position of the column in the dataset
    pub column: usize,
}

/// Channels found in a dataset, per group, ordered by channel number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelLayout {
    raw: Vec<Channel>,
    reflectance: Vec<Channel>,
    absorbance: Vec<Channel>,
}

impl ChannelLayout {
    /// Detect channel columns among `columns`, restricted to names in `candidates`
    pub fn detect(columns: &[String], candidates: &[String]) -> Self {
        let mut layout = Self::default();
        for (idx, name) in columns.iter().enumerate() {
            if !candidates.contains(name) {
                continue;
            }
            for group in ChannelGroup::ALL {
                if let Some(number) = group.channel_number(name) {
                    layout.group_mut(group).push(Channel {
                        number,
                        column: idx,
                    });
                }
            }
        }
        for group in ChannelGroup::ALL {
            layout.group_mut(group).sort_by_key(|c| (c.number, c.column));
        }
        layout
    }

    /// Channels of one group
    pub fn group(&self, group: ChannelGroup) -> &[Channel] {
        match group {
            ChannelGroup::Raw => &self.raw,
            ChannelGroup::Reflectance => &self.reflectance,
            ChannelGroup::Absorbance => &self.absorbance,
        }
    }

    /// Raw channel with the given number
    pub fn raw_channel(&self, number: u32) -> Option<&Channel> {
        self.raw.iter().find(|c| c.number == number)
    }

    fn group_mut(&mut self, group: ChannelGroup) -> &mut Vec<Channel> {
        match group {
            ChannelGroup::Raw => &mut self.raw,
            ChannelGroup::Reflectance => &mut self.reflectance,
            ChannelGroup::Absorbance => &mut self.absorbance,
        }
    }
}
