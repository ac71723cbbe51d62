//! Subset of the OpenCV `FileStorage` XML format.
//!
//! Reading covers integer/real scalars and `opencv-matrix` nodes, optionally
//! inside an unnamed sequence (`<_>` children). Writing covers the same
//! shapes with doubles (`dt` = `d`).

use nalgebra::DMatrix;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element must be <opencv_storage>, got <{0}>")]
    NotStorage(String),
    #[error("missing node <{0}>")]
    Missing(String),
    #[error("node <{node}>: {reason}")]
    Malformed { node: String, reason: String },
}

fn malformed(node: &str, reason: impl Into<String>) -> StorageError {
    StorageError::Malformed {
        node: node.to_string(),
        reason: reason.into(),
    }
}

/// Parsed `<opencv_storage>` document.
pub struct StorageDoc<'input> {
    doc: roxmltree::Document<'input>,
}

impl<'input> StorageDoc<'input> {
    pub fn parse(text: &'input str) -> Result<Self, StorageError> {
        let doc = roxmltree::Document::parse(text)?;
        let root = doc.root_element();
        if root.tag_name().name() != "opencv_storage" {
            return Err(StorageError::NotStorage(root.tag_name().name().to_string()));
        }
        Ok(Self { doc })
    }

    fn node(&self, name: &str) -> Result<roxmltree::Node<'_, 'input>, StorageError> {
        self.doc
            .root_element()
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == name)
            .ok_or_else(|| StorageError::Missing(name.to_string()))
    }

    pub fn read_f64(&self, name: &str) -> Result<f64, StorageError> {
        let text = self.node(name)?.text().unwrap_or("").trim().to_string();
        text.parse()
            .map_err(|_| malformed(name, format!("expected a number, got {text:?}")))
    }

    pub fn read_matrix(&self, name: &str) -> Result<DMatrix<f64>, StorageError> {
        parse_matrix(name, self.node(name)?)
    }

    /// Read a sequence of matrices written as `<name><_ type_id="opencv-matrix">...</_>...</name>`.
    pub fn read_matrix_seq(&self, name: &str) -> Result<Vec<DMatrix<f64>>, StorageError> {
        self.node(name)?
            .children()
            .filter(|n| n.is_element())
            .map(|n| parse_matrix(name, n))
            .collect()
    }
}

fn child_text<'a>(node: roxmltree::Node<'a, '_>, name: &str, owner: &str) -> Result<&'a str, StorageError> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(str::trim)
        .ok_or_else(|| malformed(owner, format!("missing <{name}>")))
}

fn parse_matrix(name: &str, node: roxmltree::Node<'_, '_>) -> Result<DMatrix<f64>, StorageError> {
    if let Some(type_id) = node.attribute("type_id") {
        if type_id != "opencv-matrix" {
            return Err(malformed(name, format!("unsupported type_id {type_id:?}")));
        }
    }
    let rows: usize = child_text(node, "rows", name)?
        .parse()
        .map_err(|_| malformed(name, "bad <rows>"))?;
    let cols: usize = child_text(node, "cols", name)?
        .parse()
        .map_err(|_| malformed(name, "bad <cols>"))?;
    let dt = child_text(node, "dt", name)?;
    if !matches!(dt, "d" | "f" | "i" | "u" | "s" | "w" | "c") {
        return Err(malformed(name, format!("unsupported element type {dt:?}")));
    }
    let data = node
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "data")
        .and_then(|n| n.text())
        .unwrap_or("");
    let values = data
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| malformed(name, format!("bad value {tok:?}")))
        })
        .collect::<Result<Vec<f64>, _>>()?;
    if values.len() != rows * cols {
        return Err(malformed(
            name,
            format!("{rows}x{cols} matrix with {} values", values.len()),
        ));
    }
    Ok(DMatrix::from_row_slice(rows, cols, &values))
}

/// Incremental writer for an `<opencv_storage>` document.
pub struct StorageWriter {
    out: String,
}

impl Default for StorageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageWriter {
    pub fn new() -> Self {
        Self {
            out: String::from("<?xml version=\"1.0\"?>\n<opencv_storage>\n"),
        }
    }

    pub fn scalar_int(&mut self, name: &str, value: i64) -> &mut Self {
        self.out.push_str(&format!("<{name}>{value}</{name}>\n"));
        self
    }

    pub fn matrix(&mut self, name: &str, m: &DMatrix<f64>) -> &mut Self {
        self.out.push_str(&format!("<{name} type_id=\"opencv-matrix\">\n"));
        write_matrix_body(&mut self.out, m, "  ");
        self.out.push_str(&format!("</{name}>\n"));
        self
    }

    pub fn matrix_seq(&mut self, name: &str, items: &[DMatrix<f64>]) -> &mut Self {
        self.out.push_str(&format!("<{name}>\n"));
        for m in items {
            self.out.push_str("  <_ type_id=\"opencv-matrix\">\n");
            write_matrix_body(&mut self.out, m, "    ");
            self.out.push_str("  </_>\n");
        }
        self.out.push_str(&format!("</{name}>\n"));
        self
    }

    pub fn finish(mut self) -> String {
        self.out.push_str("</opencv_storage>\n");
        self.out
    }
}

fn write_matrix_body(out: &mut String, m: &DMatrix<f64>, indent: &str) {
    out.push_str(&format!("{indent}<rows>{}</rows>\n", m.nrows()));
    out.push_str(&format!("{indent}<cols>{}</cols>\n", m.ncols()));
    out.push_str(&format!("{indent}<dt>d</dt>\n{indent}<data>"));
    for r in 0..m.nrows() {
        for c in 0..m.ncols() {
            out.push_str(&format!("\n{indent}  {:.16e}", m[(r, c)]));
        }
    }
    out.push_str("</data>\n");
}
