/// Errors from support vector training and prediction.
#[derive(Debug, thiserror::Error)]
pub enum SvmError {
    /// Returned when C is not positive and finite.
    #[error("C must be positive and finite, got {c}")]
    InvalidC {
        /// The rejected value.
        c: f64,
    },

    /// Returned when an explicit RBF gamma is not positive and finite.
    #[error("gamma must be positive and finite, got {gamma}")]
    InvalidGamma {
        /// The rejected value.
        gamma: f64,
    },

    /// Returned when the stopping tolerance is not positive and finite.
    #[error("tolerance must be positive and finite, got {tolerance}")]
    InvalidTolerance {
        /// The rejected value.
        tolerance: f64,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when rows have inconsistent widths.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when labels or weights do not line up with the feature rows.
    #[error("{what} has {got} entries, expected {expected}")]
    LengthMismatch {
        /// Which input is misaligned.
        what: &'static str,
        /// The number of feature rows.
        expected: usize,
        /// The number of entries provided.
        got: usize,
    },

    /// Returned when a label is neither 0 nor 1.
    #[error("label {label} at sample {sample_index} is not binary")]
    NonBinaryLabel {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The label found.
        label: usize,
    },

    /// Returned when the training labels contain only one class.
    #[error("training labels contain a single class ({class})")]
    SingleClass {
        /// The only class present.
        class: usize,
    },

    /// Returned when a feature value or weight is NaN, infinite, or a
    /// weight is not strictly positive.
    #[error("invalid value at sample {sample_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a prediction input has the wrong width.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },
}
