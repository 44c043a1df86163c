use crate::BufferErr;
use apm_collector_runtime::file::list_dir;
use apm_collector_types::TimeBucket;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

pub const DEFAULT_BUFFER_DIR: &str = "../buffer/";
pub const DEFAULT_FILE_PREFIX: &str = "data";
pub const DEFAULT_FILE_SUFFIX: &str = "sw";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_READ_PERIOD: Duration = Duration::from_secs(3);

/// A data file of the segment buffer, named `<prefix>_<timeBucket>.<suffix>`.
///
/// Data files are ordered by their time bucket, which is the order they were created in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataFile {
    time_bucket: TimeBucket,
    name: String,
}

impl DataFile {
    pub fn new(time_bucket: TimeBucket, name: String) -> Self {
        Self { time_bucket, name }
    }

    pub fn time_bucket(&self) -> TimeBucket {
        self.time_bucket
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for DataFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DataFile({})", self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferOptions {
    buffer_dir: PathBuf,
    file_prefix: String,
    file_suffix: String,
    max_file_size: u64,
    read_period: Duration,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            buffer_dir: PathBuf::from(DEFAULT_BUFFER_DIR),
            file_prefix: DEFAULT_FILE_PREFIX.to_owned(),
            file_suffix: DEFAULT_FILE_SUFFIX.to_owned(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            read_period: DEFAULT_READ_PERIOD,
        }
    }
}

impl BufferOptions {
    pub fn buffer_dir(&self) -> &PathBuf {
        &self.buffer_dir
    }

    pub fn set_buffer_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.buffer_dir = dir.into();
        self
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    pub fn set_file_prefix<S: Into<String>>(&mut self, prefix: S) -> &mut Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn file_suffix(&self) -> &str {
        &self.file_suffix
    }

    pub fn set_file_suffix<S: Into<String>>(&mut self, suffix: S) -> &mut Self {
        self.file_suffix = suffix.into();
        self
    }

    /// Once a data file grows beyond this many bytes, the writer rotates to a new one.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn set_max_file_size(&mut self, bytes: u64) -> &mut Self {
        self.max_file_size = bytes;
        self
    }

    /// How often the reader scans the buffer.
    pub fn read_period(&self) -> Duration {
        self.read_period
    }

    pub fn set_read_period(&mut self, period: Duration) -> &mut Self {
        self.read_period = period;
        self
    }

    pub fn file_name(&self, time_bucket: TimeBucket) -> String {
        format!("{}_{}.{}", self.file_prefix, time_bucket, self.file_suffix)
    }

    pub fn data_file(&self, time_bucket: TimeBucket) -> DataFile {
        DataFile::new(time_bucket, self.file_name(time_bucket))
    }

    /// Returns `None` if `name` is not a data file of this buffer.
    pub fn parse_file_name(&self, name: &str) -> Option<DataFile> {
        let bucket = name
            .strip_prefix(self.file_prefix.as_str())?
            .strip_prefix('_')?
            .strip_suffix(self.file_suffix.as_str())?
            .strip_suffix('.')?;
        if bucket.is_empty() || !bucket.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let time_bucket = TimeBucket::from_str(bucket).ok()?;
        Some(DataFile::new(time_bucket, name.to_owned()))
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.buffer_dir.join(name)
    }

    /// All data files in the buffer directory, oldest first. Foreign files are ignored.
    pub async fn list_data_files(&self) -> Result<Vec<DataFile>, BufferErr> {
        let names = list_dir(&self.buffer_dir)
            .await
            .map_err(BufferErr::IoError)?;
        let mut files: Vec<DataFile> = names
            .iter()
            .filter_map(|name| self.parse_file_name(name))
            .collect();
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_file_name() {
        let options = BufferOptions::default();
        let bucket = TimeBucket::new(20171122102345);
        assert_eq!(options.file_name(bucket), "data_20171122102345.sw");
        assert_eq!(
            options.parse_file_name("data_20171122102345.sw"),
            Some(DataFile::new(bucket, "data_20171122102345.sw".to_owned()))
        );
        assert_eq!(options.parse_file_name("data_100.sw").map(|f| f.time_bucket()), Some(TimeBucket::new(100)));
        assert_eq!(options.parse_file_name("data_.sw"), None);
        assert_eq!(options.parse_file_name("data_12x.sw"), None);
        assert_eq!(options.parse_file_name("data_100.sw.tmp"), None);
        assert_eq!(options.parse_file_name("offset.json"), None);
    }

    #[test]
    fn test_order() {
        let options = BufferOptions::default();
        let mut files: Vec<DataFile> = ["data_300.sw", "data_1000.sw", "data_100.sw", "data_200.sw"]
            .into_iter()
            .filter_map(|n| options.parse_file_name(n))
            .collect();
        files.sort();
        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        // by time bucket, not lexically
        assert_eq!(names, ["data_100.sw", "data_200.sw", "data_300.sw", "data_1000.sw"]);
    }
}
