//! Derived Feature Construction

use crate::groups::{ChannelGroup, ChannelLayout};
use crate::statistics::StatisticalFeatures;
use crate::FeatureError;
use data_validator::Dataset;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Additive guard used in ratios
pub const RATIO_EPSILON: f64 = 1e-6;

/// A feature derived from the base columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedFeature {
    PeakIntensity,
    PeakChannel,
    TotalIntensity,
    IntensityMean,
    IntensityStd,
    IntensityRange,
    AvgReflectance,
    ReflectanceStd,
    ReflectanceRange,
    AvgAbsorbance,
    AbsorbanceStd,
    MaxAbsorbance,
    AbsorbanceSlope,
    VocRatio,
    RedBlueRatio,
    NirRedRatio,
    NdviLike,
    LogCfu,
}

impl DerivedFeature {
    /// Every derived feature, in the order it is appended to the feature list
    pub const CANONICAL: [DerivedFeature; 18] = [
        DerivedFeature::PeakIntensity,
        DerivedFeature::PeakChannel,
        DerivedFeature::TotalIntensity,
        DerivedFeature::IntensityMean,
        DerivedFeature::IntensityStd,
        DerivedFeature::IntensityRange,
        DerivedFeature::AvgReflectance,
        DerivedFeature::ReflectanceStd,
        DerivedFeature::ReflectanceRange,
        DerivedFeature::AvgAbsorbance,
        DerivedFeature::AbsorbanceStd,
        DerivedFeature::MaxAbsorbance,
        DerivedFeature::AbsorbanceSlope,
        DerivedFeature::VocRatio,
        DerivedFeature::RedBlueRatio,
        DerivedFeature::NirRedRatio,
        DerivedFeature::NdviLike,
        DerivedFeature::LogCfu,
    ];

    /// Column name of the feature
    pub fn name(&self) -> &'static str {
        match self {
            DerivedFeature::PeakIntensity => "peak_intensity",
            DerivedFeature::PeakChannel => "peak_channel",
            DerivedFeature::TotalIntensity => "total_intensity",
            DerivedFeature::IntensityMean => "intensity_mean",
            DerivedFeature::IntensityStd => "intensity_std",
            DerivedFeature::IntensityRange => "intensity_range",
            DerivedFeature::AvgReflectance => "avg_reflectance",
            DerivedFeature::ReflectanceStd => "reflectance_std",
            DerivedFeature::ReflectanceRange => "reflectance_range",
            DerivedFeature::AvgAbsorbance => "avg_absorbance",
            DerivedFeature::AbsorbanceStd => "absorbance_std",
            DerivedFeature::MaxAbsorbance => "max_absorbance",
            DerivedFeature::AbsorbanceSlope => "absorbance_slope",
            DerivedFeature::VocRatio => "voc_ratio",
            DerivedFeature::RedBlueRatio => "red_blue_ratio",
            DerivedFeature::NirRedRatio => "nir_red_ratio",
            DerivedFeature::NdviLike => "ndvi_like",
            DerivedFeature::LogCfu => "log_cfu",
        }
    }

    /// Channel group the feature aggregates, if any
    pub fn group(&self) -> Option<ChannelGroup> {
        use DerivedFeature::*;
        match self {
            PeakIntensity | PeakChannel | TotalIntensity | IntensityMean | IntensityStd
            | IntensityRange => Some(ChannelGroup::Raw),
            AvgReflectance | ReflectanceStd | ReflectanceRange => Some(ChannelGroup::Reflectance),
            AvgAbsorbance | AbsorbanceStd | MaxAbsorbance | AbsorbanceSlope => {
                Some(ChannelGroup::Absorbance)
            }
            VocRatio | RedBlueRatio | NirRedRatio | NdviLike | LogCfu => None,
        }
    }
}

/// Feature engineering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineeringConfig {
    /// Raw VOC sensor reading column
    pub voc_raw_column: String,
    /// VOC sensor voltage column
    pub voc_voltage_column: String,
    /// Concentration-like column transformed with `log10(x + 1)`
    pub concentration_column: Option<String>,
    /// Raw channels (low, high) compared by the normalised difference index
    pub ndvi_channels: (u32, u32),
    /// Minimum raw channel count before wavelength ratios are built
    pub min_ratio_channels: usize,
}

impl Default for EngineeringConfig {
    fn default() -> Self {
        Self {
            voc_raw_column: "VOC_raw".to_string(),
            voc_voltage_column: "VOC_voltage".to_string(),
            concentration_column: Some("CFU_value".to_string()),
            ndvi_channels: (4, 8),
            min_ratio_channels: 4,
        }
    }
}

/// Dataset extended with derived columns
#[derive(Debug, Clone)]
pub struct EngineeredDataset {
    /// Cleaned columns followed by derived columns
    pub dataset: Dataset,
    /// Final feature order: base features then derived features
    pub feature_names: Vec<String>,
    /// Derived features that were actually created
    pub derived: Vec<DerivedFeature>,
}

impl EngineeredDataset {
    /// Feature matrix in `feature_names` order
    pub fn feature_matrix(&self) -> Result<Array2<f64>, FeatureError> {
        Ok(self.dataset.select(&self.feature_names)?)
    }
}

/// Column positions the row computation needs
struct SourceColumns {
    layout: ChannelLayout,
    voc_raw: Option<usize>,
    voc_voltage: Option<usize>,
    ndvi: Option<(usize, usize)>,
    concentration: Option<usize>,
}

/// Builds derived features from spectral channel groups
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: EngineeringConfig,
}

impl FeatureEngineer {
    /// Create a new feature engineer
    pub fn new(config: EngineeringConfig) -> Self {
        Self { config }
    }

    /// Derived features that `engineer` would create for these columns
    pub fn plan(&self, columns: &[String], base_features: &[String]) -> Vec<DerivedFeature> {
        let sources = self.sources(columns, base_features);
        self.plan_from(&sources)
    }

    /// Append derived columns and fix the final feature order.
    ///
    /// Channel groups are detected among `base_features`; the VOC and
    /// concentration sources may be any dataset column.
    pub fn engineer(
        &self,
        dataset: Dataset,
        base_features: &[String],
    ) -> Result<EngineeredDataset, FeatureError> {
        for name in base_features {
            if dataset.column_index(name).is_none() {
                return Err(FeatureError::UnknownColumn(name.clone()));
            }
        }

        let sources = self.sources(&dataset.columns, base_features);
        let derived = self.plan_from(&sources);

        for feature in &derived {
            if dataset.column_index(feature.name()).is_some() {
                return Err(FeatureError::NameCollision(feature.name().to_string()));
            }
        }

        let mut extra = Array2::<f64>::zeros((dataset.len(), derived.len()));
        for (i, row) in dataset.values.rows().into_iter().enumerate() {
            let values = self.compute_row(&sources, &derived, row);
            for (j, v) in values.into_iter().enumerate() {
                extra[[i, j]] = v;
            }
        }

        let names: Vec<String> = derived.iter().map(|f| f.name().to_string()).collect();
        let mut feature_names = base_features.to_vec();
        feature_names.extend(names.iter().cloned());

        debug!("Derived features: {:?}", names);
        info!(
            "Engineered {} derived features, {} total",
            derived.len(),
            feature_names.len()
        );

        let dataset = dataset.with_columns(names, extra)?;
        Ok(EngineeredDataset {
            dataset,
            feature_names,
            derived,
        })
    }

    fn sources(&self, columns: &[String], base_features: &[String]) -> SourceColumns {
        let position = |name: &str| columns.iter().position(|c| c == name);
        let layout = ChannelLayout::detect(columns, base_features);
        let (low, high) = self.config.ndvi_channels;
        let ndvi = match (layout.raw_channel(low), layout.raw_channel(high)) {
            (Some(l), Some(h)) => Some((l.column, h.column)),
            _ => None,
        };
        SourceColumns {
            voc_raw: position(&self.config.voc_raw_column),
            voc_voltage: position(&self.config.voc_voltage_column),
            concentration: self
                .config
                .concentration_column
                .as_deref()
                .and_then(|c| position(c)),
            ndvi,
            layout,
        }
    }

    fn plan_from(&self, sources: &SourceColumns) -> Vec<DerivedFeature> {
        let raw_count = sources.layout.group(ChannelGroup::Raw).len();
        DerivedFeature::CANONICAL
            .into_iter()
            .filter(|feature| match feature.group() {
                Some(group) => !sources.layout.group(group).is_empty(),
                None => match feature {
                    DerivedFeature::VocRatio => {
                        sources.voc_raw.is_some() && sources.voc_voltage.is_some()
                    }
                    DerivedFeature::RedBlueRatio | DerivedFeature::NirRedRatio => {
                        raw_count >= self.config.min_ratio_channels.max(3)
                    }
                    DerivedFeature::NdviLike => sources.ndvi.is_some(),
                    DerivedFeature::LogCfu => sources.concentration.is_some(),
                    _ => false,
                },
            })
            .collect()
    }

    fn compute_row(
        &self,
        sources: &SourceColumns,
        derived: &[DerivedFeature],
        row: ArrayView1<'_, f64>,
    ) -> Vec<f64> {
        let group_values = |group: ChannelGroup| -> Vec<f64> {
            sources
                .layout
                .group(group)
                .iter()
                .map(|c| row[c.column])
                .collect()
        };
        let raw = group_values(ChannelGroup::Raw);
        let raw_stats = StatisticalFeatures::compute(&raw);
        let reflect_stats = StatisticalFeatures::compute(&group_values(ChannelGroup::Reflectance));
        let absorb_stats = StatisticalFeatures::compute(&group_values(ChannelGroup::Absorbance));
        let raw_channels = sources.layout.group(ChannelGroup::Raw);
        let ratio = |num: f64, den: f64| (num + RATIO_EPSILON) / (den + RATIO_EPSILON);

        derived
            .iter()
            .map(|feature| {
                let value = match feature {
                    DerivedFeature::PeakIntensity => raw_stats.max,
                    DerivedFeature::PeakChannel => raw_channels
                        .get(raw_stats.argmax)
                        .map_or(0.0, |c| f64::from(c.number)),
                    DerivedFeature::TotalIntensity => raw_stats.sum,
                    DerivedFeature::IntensityMean => raw_stats.mean,
                    DerivedFeature::IntensityStd => raw_stats.std_dev,
                    DerivedFeature::IntensityRange => raw_stats.range(),
                    DerivedFeature::AvgReflectance => reflect_stats.mean,
                    DerivedFeature::ReflectanceStd => reflect_stats.std_dev,
                    DerivedFeature::ReflectanceRange => reflect_stats.range(),
                    DerivedFeature::AvgAbsorbance => absorb_stats.mean,
                    DerivedFeature::AbsorbanceStd => absorb_stats.std_dev,
                    DerivedFeature::MaxAbsorbance => absorb_stats.max,
                    DerivedFeature::AbsorbanceSlope => absorb_stats.slope,
                    DerivedFeature::VocRatio => match (sources.voc_voltage, sources.voc_raw) {
                        (Some(v), Some(r)) => row[v] / (row[r] + RATIO_EPSILON),
                        _ => 0.0,
                    },
                    DerivedFeature::RedBlueRatio => ratio(raw[2], raw[0]),
                    DerivedFeature::NirRedRatio => ratio(raw[raw.len() - 1], raw[2]),
                    DerivedFeature::NdviLike => match sources.ndvi {
                        Some((low, high)) => {
                            (row[high] - row[low]) / (row[high] + row[low] + RATIO_EPSILON)
                        }
                        None => 0.0,
                    },
                    DerivedFeature::LogCfu => sources
                        .concentration
                        .map_or(0.0, |c| (row[c].max(0.0) + 1.0).log10()),
                };
                if value.is_finite() {
                    value
                } else {
                    0.0
                }
            })
            .collect()
    }
}
