/// Errors from logistic regression training and prediction.
#[derive(Debug, thiserror::Error)]
pub enum LinearError {
    /// Returned when the inverse regularization strength is not positive.
    #[error("C must be positive and finite, got {c}")]
    InvalidC {
        /// The rejected value.
        c: f64,
    },

    /// Returned when the learning rate is not positive.
    #[error("learning rate must be positive and finite, got {learning_rate}")]
    InvalidLearningRate {
        /// The rejected value.
        learning_rate: f64,
    },

    /// Returned when max_epochs is zero.
    #[error("max_epochs must be at least 1")]
    InvalidMaxEpochs,

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

    /// Returned when a feature value or weight is NaN or infinite.
    #[error("non-finite input at sample {sample_index}")]
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
