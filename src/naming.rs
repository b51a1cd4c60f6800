// File names derived from record fields

use crate::config::FileNaming;
use crate::models::{Dataset, SavedQuery};

const EXTENSION: &str = "sql";

/// `<id>_<label>.sql`
pub fn query_file_name(query: &SavedQuery, naming: FileNaming) -> String {
    format!("{}_{}.{}", query.id, clean(&query.label, naming), EXTENSION)
}

/// `<table_name>.sql`
pub fn dataset_file_name(dataset: &Dataset, naming: FileNaming) -> String {
    format!("{}.{}", clean(&dataset.table_name, naming), EXTENSION)
}

fn clean(field: &str, naming: FileNaming) -> String {
    match naming {
        FileNaming::Raw => field.to_string(),
        FileNaming::Sanitized => field
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                c => c,
            })
            .collect(),
    }
}
