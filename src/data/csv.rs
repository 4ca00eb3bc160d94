//! CSV parsing into a `Dataset`.
//!
//! Format:
//! - UTF-8, comma-separated
//! - Optional header row, auto-detected: the first row is a header only if
//!   every non-empty cell is non-numeric (so categorical *data* columns do
//!   not trip the detection)
//! - Double-quoted fields with embedded commas and escaped quotes
//!
//! Column handling follows the acceptance-mask contract: the mask has one
//! flag per source column; rejected columns are dropped, not zero-filled.
//! Accepted numeric cells pass through; accepted non-numeric cells are
//! index-encoded against a per-column vocabulary built in encounter order.

use std::fs;
use std::path::Path;

use crate::data::dataset::{Dataset, Tuple};
use crate::error::{Error, Result};

/// Parses CSV text into a dataset whose first `nin` accepted columns are
/// predictors and remaining `nout` accepted columns are answers.
pub fn parse_csv(text: &str, nin: usize, nout: usize, accept: &[bool]) -> Result<Dataset> {
    let accepted = accept.iter().filter(|a| **a).count();
    if accepted != nin + nout {
        return Err(Error::Config(format!(
            "acceptance mask selects {} columns, expected {} predictors + {} answers",
            accepted, nin, nout
        )));
    }

    let (rows, vocab) = collect_rows(text, accept)?;

    let mut data = Dataset::new(nin, nout);
    for row in rows {
        let answers = row[nin..].to_vec();
        let mut predictors = row;
        predictors.truncate(nin);
        data.push(Tuple::new(predictors, answers))?;
    }
    data.set_vocab(vocab);

    Ok(data)
}

/// Class-column variant: the last accepted column is the class label
/// (index-encoded when categorical), giving a dataset with `nout == 1`.
pub fn parse_csv_class(text: &str, accept: &[bool]) -> Result<Dataset> {
    let accepted = accept.iter().filter(|a| **a).count();
    if accepted < 2 {
        return Err(Error::Config(format!(
            "acceptance mask selects {} columns; class loading needs at least one \
             predictor plus the class column",
            accepted
        )));
    }

    parse_csv_text_class(text, accept, accepted - 1)
}

fn parse_csv_text_class(text: &str, accept: &[bool], nin: usize) -> Result<Dataset> {
    let (rows, vocab) = collect_rows(text, accept)?;

    let mut data = Dataset::new(nin, 1);
    for row in rows {
        let answers = vec![row[nin]];
        let mut predictors = row;
        predictors.truncate(nin);
        data.push(Tuple::new(predictors, answers))?;
    }
    data.set_vocab(vocab);

    Ok(data)
}

pub fn load_csv(path: &Path, nin: usize, nout: usize, accept: &[bool]) -> Result<Dataset> {
    let text = fs::read_to_string(path)?;
    parse_csv(&text, nin, nout, accept)
}

pub fn load_csv_class(path: &Path, accept: &[bool]) -> Result<Dataset> {
    let text = fs::read_to_string(path)?;
    parse_csv_class(&text, accept)
}

/// Walks the rows, applies the acceptance mask and encodes cells. Returns
/// the encoded rows plus the per-accepted-column vocabularies.
fn collect_rows(text: &str, accept: &[bool]) -> Result<(Vec<Vec<f64>>, Vec<Vec<String>>)> {
    let n_accepted = accept.iter().filter(|a| **a).count();
    let mut vocab: Vec<Vec<String>> = vec![Vec::new(); n_accepted];
    let mut rows: Vec<Vec<f64>> = Vec::new();

    let mut lines = text.lines().peekable();
    if let Some(first) = lines.peek() {
        if is_header(first) {
            lines.next();
        }
    }

    for (row_idx, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let cells = parse_csv_row(line);
        if cells.len() != accept.len() {
            return Err(Error::Format(format!(
                "row {}: expected {} columns, got {}",
                row_idx + 1,
                accept.len(),
                cells.len()
            )));
        }

        let mut encoded = Vec::with_capacity(n_accepted);
        let mut slot = 0;
        for (cell, &keep) in cells.iter().zip(accept.iter()) {
            if !keep {
                continue;
            }
            encoded.push(encode_cell(cell, &mut vocab[slot], row_idx + 1)?);
            slot += 1;
        }
        rows.push(encoded);
    }

    if rows.is_empty() {
        return Err(Error::Format(
            "source contains no data rows after parsing".into(),
        ));
    }

    Ok((rows, vocab))
}

/// Numeric cells pass through; anything else becomes its vocabulary index.
fn encode_cell(cell: &str, vocab: &mut Vec<String>, row_num: usize) -> Result<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Err(Error::Format(format!("row {}: empty cell", row_num)));
    }

    if let Ok(v) = trimmed.parse::<f64>() {
        return Ok(v);
    }

    let index = match vocab.iter().position(|known| known == trimmed) {
        Some(i) => i,
        None => {
            vocab.push(trimmed.to_string());
            vocab.len() - 1
        }
    };
    Ok(index as f64)
}

/// A row is a header only if every non-empty cell fails to parse as a
/// number. A single categorical data column must not make every row look
/// like a header.
fn is_header(line: &str) -> bool {
    let cells = parse_csv_row(line);
    let mut any = false;
    for c in &cells {
        let t = c.trim();
        if t.is_empty() {
            continue;
        }
        if t.parse::<f64>().is_ok() {
            return false;
        }
        any = true;
    }
    any
}

/// Splits one CSV row, honouring double-quoted fields and `""` escapes.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '"' => {
                if in_quotes && i + 1 < chars.len() && chars[i + 1] == '"' {
                    current.push('"');
                    i += 2;
                    continue;
                }
                in_quotes = !in_quotes;
            }
            ',' if !in_quotes => {
                fields.push(current.clone());
                current.clear();
            }
            c => current.push(c),
        }
        i += 1;
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const IRIS_LIKE: &str = "\
id,sepal_length,sepal_width,petal_length,petal_width,species
1,5.1,3.5,1.4,0.2,setosa
2,4.9,3.0,1.4,0.2,setosa
3,7.0,3.2,4.7,1.4,versicolor
4,6.3,3.3,6.0,2.5,virginica
";

    #[test]
    fn class_loading_drops_rejected_columns_and_encodes_labels() {
        let accept = [false, true, true, true, true, true];
        let data = parse_csv_class(IRIS_LIKE, &accept).unwrap();

        assert_eq!(data.len(), 4);
        assert_eq!(data.nin(), 4);
        assert_eq!(data.nout(), 1);
        // The id column is gone, not zero-filled.
        assert_eq!(data.tuple(0).predictors, vec![5.1, 3.5, 1.4, 0.2]);
        // Species encoded in encounter order.
        assert_eq!(data.answer(0), 0.0);
        assert_eq!(data.answer(2), 1.0);
        assert_eq!(data.answer(3), 2.0);
        assert_eq!(data.vocabulary(4), &["setosa", "versicolor", "virginica"]);
    }

    #[test]
    fn split_loading_honors_nin_nout() {
        let text = "1.0,2.0,3.0,0.0,1.0\n4.0,5.0,6.0,1.0,0.0\n";
        let accept = [true; 5];
        let data = parse_csv(text, 3, 2, &accept).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.tuple(1).predictors, vec![4.0, 5.0, 6.0]);
        assert_eq!(data.answer_vec(1), &[1.0, 0.0]);
    }

    #[test]
    fn column_count_mismatch_is_fatal() {
        let text = "1.0,2.0,3.0\n1.0,2.0\n";
        let err = parse_csv(text, 2, 1, &[true, true, true]);
        assert!(matches!(err, Err(Error::Format(_))));
    }

    #[test]
    fn mask_width_must_match_shape() {
        let text = "1.0,2.0,3.0\n";
        let err = parse_csv(text, 2, 2, &[true, true, true]);
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn empty_source_is_fatal() {
        let err = parse_csv("", 1, 1, &[true, true]);
        assert!(matches!(err, Err(Error::Format(_))));
    }

    #[test]
    fn header_detection_survives_categorical_data() {
        // No header here: the first row mixes numbers and a category.
        let text = "5.1,red\n4.9,blue\n";
        let data = parse_csv(text, 1, 1, &[true, true]).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.answer(0), 0.0);
        assert_eq!(data.answer(1), 1.0);
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let row = parse_csv_row("\"a,b\",2,\"say \"\"hi\"\"\"");
        assert_eq!(row, vec!["a,b", "2", "say \"hi\""]);
    }
}
