//! alist sparse parity-check matrix format
//!
//! ```text
//! N M
//! max_col_degree max_row_degree
//! col_degree[0] .. col_degree[N-1]
//! row_degree[0] .. row_degree[M-1]
//! N lines: 1-based check indices of each column, zero padded
//! M lines: 1-based variable indices of each row, zero padded
//! ```
//!
//! Columns and rows describe the same matrix twice. The graph is built from
//! the rows; the columns must agree with them.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::DecoderError;
use crate::graph::ParityCheckGraph;

/// Non-blank lines of an alist document with their 1-based line numbers
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    last: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
            last: 0,
        }
    }

    fn error(line: usize, message: impl Into<String>) -> DecoderError {
        DecoderError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Numbers of the next non-blank line
    fn numbers(&mut self, what: &str) -> Result<(usize, Vec<usize>), DecoderError> {
        for (index, line) in self.inner.by_ref() {
            self.last = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            let values = line
                .split_whitespace()
                .map(|token| {
                    token
                        .parse::<usize>()
                        .map_err(|_| Self::error(index + 1, format!("invalid number {:?} in {}", token, what)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok((index + 1, values));
        }
        Err(Self::error(self.last + 1, format!("missing {}", what)))
    }

    fn exact(&mut self, count: usize, what: &str) -> Result<(usize, Vec<usize>), DecoderError> {
        let (line, values) = self.numbers(what)?;
        if values.len() != count {
            return Err(Self::error(
                line,
                format!("expected {} values in {}, found {}", count, what, values.len()),
            ));
        }
        Ok((line, values))
    }

    /// One adjacency line: `degree` indices in `1..=bound`, then zero padding
    fn adjacency(&mut self, degree: usize, bound: usize, what: &str) -> Result<Vec<usize>, DecoderError> {
        let (line, values) = self.numbers(what)?;
        let (entries, padding) = values.split_at(values.len().min(degree));
        if entries.len() != degree || padding.iter().any(|&v| v != 0) {
            return Err(Self::error(
                line,
                format!("expected {} entries in {}", degree, what),
            ));
        }
        entries
            .iter()
            .map(|&v| {
                if v == 0 || v > bound {
                    Err(Self::error(line, format!("index {} out of range 1..={} in {}", v, bound, what)))
                } else {
                    Ok(v - 1)
                }
            })
            .collect()
    }
}

/// Parse an alist document into a Tanner graph
pub fn parse(text: &str) -> Result<ParityCheckGraph, DecoderError> {
    let mut lines = Lines::new(text);

    let (_, dims) = lines.exact(2, "matrix dimensions")?;
    let (n, m) = (dims[0], dims[1]);
    let (max_line, maxima) = lines.exact(2, "maximum degrees")?;
    let (max_col, max_row) = (maxima[0], maxima[1]);

    let (col_line, col_degrees) = lines.exact(n, "column degrees")?;
    if col_degrees.iter().any(|&d| d > max_col) {
        return Err(Lines::error(col_line, format!("column degree above declared maximum {}", max_col)));
    }
    let (row_line, row_degrees) = lines.exact(m, "row degrees")?;
    if row_degrees.iter().any(|&d| d > max_row) {
        return Err(Lines::error(row_line, format!("row degree above declared maximum {}", max_row)));
    }
    if col_degrees.iter().sum::<usize>() != row_degrees.iter().sum::<usize>() {
        return Err(Lines::error(max_line, "column and row degrees count different edges"));
    }

    let columns = col_degrees
        .iter()
        .enumerate()
        .map(|(v, &d)| lines.adjacency(d, m, &format!("column {}", v + 1)))
        .collect::<Result<Vec<_>, _>>()?;
    let mut rows = Vec::with_capacity(m);
    let mut last_row_line = lines.last;
    for (c, &d) in row_degrees.iter().enumerate() {
        rows.push(lines.adjacency(d, n, &format!("row {}", c + 1))?);
        last_row_line = lines.last;
    }

    let graph = ParityCheckGraph::from_check_rows(n, &rows).map_err(|e| Lines::error(last_row_line, e.to_string()))?;

    for (v, (mut column, from_rows)) in columns.into_iter().zip(graph.variable_columns()).enumerate() {
        column.sort_unstable();
        if column != from_rows {
            return Err(Lines::error(
                last_row_line,
                format!("column {} disagrees with the row lists", v + 1),
            ));
        }
    }

    Ok(graph)
}

/// Read and parse an alist file
pub fn load(path: impl AsRef<Path>) -> Result<ParityCheckGraph, DecoderError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Render a Tanner graph as an alist document
pub fn write(graph: &ParityCheckGraph) -> String {
    let columns = graph.variable_columns();
    let rows = graph.check_rows();
    let max_col = graph.max_variable_degree();
    let max_row = graph.max_check_degree();

    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(out, "{} {}", graph.n_variables(), graph.n_checks());
    let _ = writeln!(out, "{} {}", max_col, max_row);
    push_line(&mut out, graph.variable_degrees().iter().map(|&d| d as usize));
    push_line(&mut out, graph.check_degrees().iter().map(|&d| d as usize));

    for column in &columns {
        let mut sorted = column.clone();
        sorted.sort_unstable();
        push_padded(&mut out, &sorted, max_col);
    }
    for row in &rows {
        push_padded(&mut out, row, max_row);
    }
    out
}

fn push_line(out: &mut String, values: impl Iterator<Item = usize>) {
    let line: Vec<String> = values.map(|v| v.to_string()).collect();
    out.push_str(&line.join(" "));
    out.push('\n');
}

fn push_padded(out: &mut String, indices: &[usize], width: usize) {
    let padding = width.saturating_sub(indices.len());
    push_line(
        out,
        indices.iter().map(|&i| i + 1).chain(std::iter::repeat(0).take(padding)),
    );
}
