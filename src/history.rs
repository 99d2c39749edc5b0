//! キーポイント履歴とCSV出力

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::pose::{KeypointIndex, Pose};

/// 出力ファイル名
pub const CSV_FILENAME: &str = "keypoints_data.csv";

/// CSVヘッダ
pub const CSV_HEADER: [&str; 5] = ["Name", "X", "Y", "Score", "Timestamp"];

/// 1キーポイント分の記録
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeypointRecord {
    pub name: KeypointIndex,
    pub x: f32,
    pub y: f32,
    pub score: f32,
    /// Unixエポックからのミリ秒
    pub timestamp: u64,
}

impl KeypointRecord {
    /// CSVの1行。数値は Display 表記 (整数値は `1`、小数はそのまま)
    pub fn fields(&self) -> [String; 5] {
        [
            self.name.name().to_string(),
            self.x.to_string(),
            self.y.to_string(),
            self.score.to_string(),
            self.timestamp.to_string(),
        ]
    }
}

/// 追記専用のキーポイント履歴
#[derive(Debug, Default, Clone)]
pub struct HistoryBuffer {
    records: Vec<KeypointRecord>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全姿勢の全キーポイントを同じタイムスタンプで追記し、追記件数を返す
    pub fn append(&mut self, poses: &[Pose], timestamp: u64) -> usize {
        let before = self.records.len();
        self.records.extend(poses.iter().flat_map(|pose| {
            pose.iter().map(move |(name, kp)| KeypointRecord {
                name,
                x: kp.x,
                y: kp.y,
                score: kp.score,
                timestamp,
            })
        }));
        self.records.len() - before
    }

    pub fn records(&self) -> &[KeypointRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// ヘッダ + 追記順の行。区切り文字や引用符を含むフィールドはクォートされる
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        wtr.write_record(CSV_HEADER)?;
        for record in &self.records {
            wtr.write_record(record.fields())?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        // csv は UTF-8 の入力しか書かない
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// ファイルに書き出し、書いた行数 (ヘッダ除く) を返す
    pub fn export_to<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.write_csv(BufWriter::new(file))?;
        crate::log!("[export] wrote {} records to {}", self.records.len(), path.display());
        Ok(self.records.len())
    }
}
