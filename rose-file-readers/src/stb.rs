use std::collections::HashMap;

use crate::{reader::RoseFileReader, ReadError, RoseFile};

/// A string table.
///
/// Cells are addressed as `(row, column)` where column 0 holds the row name,
/// so a row has `columns()` cells including its name.
pub struct StbFile {
    rows: usize,
    columns: usize,
    column_names: Vec<String>,
    data: String,
    cells: Vec<(usize, usize)>,
    row_keys: HashMap<String, usize>,
}

#[derive(Default)]
pub struct StbReadOptions {
    pub with_keys: bool,
}

impl RoseFile for StbFile {
    type ReadOptions = StbReadOptions;

    fn read(mut reader: RoseFileReader, read_options: &StbReadOptions) -> Result<Self, anyhow::Error> {
        let magic = reader.read_fixed_length_string(4)?;
        let version = match magic.as_ref() {
            "STB0" => 0,
            "STB1" => 1,
            _ => {
                return Err(ReadError::BadMagic {
                    expected: "STB1",
                    found: magic.into_owned(),
                }
                .into())
            }
        };

        let data_position = reader.read_u32()? as u64;
        let row_count = reader.read_u32()? as usize;
        let column_count = reader.read_u32()? as usize;
        let _row_height = reader.read_u32()?;

        if row_count == 0 || column_count == 0 {
            return Ok(Self {
                rows: 0,
                columns: column_count,
                column_names: Vec::new(),
                data: String::new(),
                cells: Vec::new(),
                row_keys: HashMap::new(),
            });
        }

        if version == 0 {
            reader.skip(4)?;
        } else {
            reader.skip(2 * (column_count as u64 + 1))?;
        }

        let mut column_names = Vec::with_capacity((column_count + 1).min(reader.remaining()));
        for _ in 0..(column_count + 1) {
            column_names.push(reader.read_u16_length_string()?.into_owned());
        }

        // The first row holds the column headers and has no cells
        let rows = row_count - 1;
        let columns = column_count;

        // Every cell carries at least a length prefix in the file
        let cell_count = match rows.checked_mul(columns) {
            Some(cell_count) if cell_count <= reader.len() => cell_count,
            _ => {
                return Err(ReadError::Truncated {
                    offset: reader.position(),
                }
                .into())
            }
        };

        let mut data = String::with_capacity(reader.remaining());
        let mut cells = vec![(0, 0); cell_count];

        for row in 0..rows {
            let name = reader.read_u16_length_string()?;
            cells[row * columns] = (data.len(), name.len());
            data.push_str(&name);
        }

        if data_position != 0 {
            reader.set_position(data_position);
        }

        for row in 0..rows {
            for column in 1..columns {
                let cell = reader.read_u16_length_string()?;
                cells[row * columns + column] = (data.len(), cell.len());
                data.push_str(&cell);
            }
        }

        let mut row_keys = HashMap::new();
        if read_options.with_keys {
            for row in 0..rows {
                let (position, size) = cells[row * columns];
                if size > 0 {
                    row_keys.insert(data[position..position + size].to_string(), row);
                }
            }
        }

        Ok(Self {
            rows,
            columns,
            column_names,
            data,
            cells,
            row_keys,
        })
    }
}

impl StbFile {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn column_name(&self, column: usize) -> Option<&str> {
        self.column_names.get(column).map(String::as_str)
    }

    /// Finds a column by header name, ignoring case.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.column_names
            .iter()
            .take(self.columns)
            .position(|column_name| column_name.trim().eq_ignore_ascii_case(name))
    }

    pub fn lookup_row_name(&self, name: &str) -> Option<usize> {
        self.row_keys.get(name).cloned()
    }

    pub fn get_row_name(&self, row: usize) -> &str {
        self.get(row, 0)
    }

    pub fn try_get(&self, row: usize, column: usize) -> Option<&str> {
        if row >= self.rows || column >= self.columns {
            return None;
        }

        let (position, size) = self.cells[row * self.columns + column];
        if size == 0 {
            return None;
        }
        Some(&self.data[position..position + size])
    }

    pub fn get(&self, row: usize, column: usize) -> &str {
        self.try_get(row, column).unwrap_or("")
    }

    pub fn try_get_int(&self, row: usize, column: usize) -> Option<i32> {
        self.try_get(row, column)
            .and_then(|x| x.trim().parse::<i32>().ok())
    }

    pub fn get_int(&self, row: usize, column: usize) -> i32 {
        self.try_get_int(row, column).unwrap_or(0)
    }
}

#[macro_export]
macro_rules! stb_column {
    (
        $column_index:literal, $name:ident, &str
    ) => {
        pub fn $name(&self, row: usize) -> Option<&str> {
            self.0.try_get(row, $column_index)
        }
    };
    (
        $column_index:literal, $name:ident, $value_type:ty
    ) => {
        pub fn $name(&self, row: usize) -> Option<$value_type> {
            self.0
                .try_get(row, $column_index)
                .and_then(|x| x.trim().parse::<$value_type>().ok())
        }
    };
    (
        $range:expr, $name:ident, [$value_type:ty; $len:literal]
    ) => {
        pub fn $name(&self, row: usize) -> [$value_type; $len] {
            let mut result: [$value_type; $len] = Default::default();

            for (i, column) in ($range).enumerate() {
                result[i] = self
                    .0
                    .try_get(row, column)
                    .and_then(|x| x.trim().parse::<$value_type>().ok())
                    .unwrap_or_default();
            }

            result
        }
    };
}
