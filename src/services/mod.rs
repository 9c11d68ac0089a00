//! Service layer - the pipeline stages
//!
//! Each stage keeps a narrow job: tokenization, row assembly, mapping-driven
//! assembly, normalization, dataset building, batch dispatch, and multi-file
//! orchestration on top of them.

pub mod batch;
pub mod dataset;
pub mod mapping_parser;
pub mod normalizer;
pub mod processor;
pub mod row_parser;
pub mod tokenizer;

pub use batch::{
    create_batches, process_dataset_in_batches, BatchConfig, BatchProcessingResult,
};
pub use dataset::{
    build_dataset_from_csv_rows, calculate_dataset_statistics, filter_dataset, merge_datasets,
    sortable_date_key, DatasetBuildResult, DatasetFilter, DatasetOptions, DatasetStatistics,
};
pub use mapping_parser::{suggest_mapping, MappingParser};
pub use normalizer::{
    csv_row_to_movement, normalize_amount, normalize_category, normalize_currency,
    normalize_date, normalize_movement_type, parse_signed_amount,
};
pub use processor::{
    FileProcessor, FileReport, ProcessAndDispatchResult, ProcessingResult,
};
pub use row_parser::{ParseMetadata, ParseOutcome, RowParser};
pub use tokenizer::{is_numeric_token, Tokenizer};
