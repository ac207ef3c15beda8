//! 运行结果.

use crate::profile::Profile;
use std::io::{self, Write};
use std::path::PathBuf;

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Run `{name}`:")?;
    writeln!(w, "{S4}Processed frames: {}", p.get_done())?;
    writeln!(w, "{S4}Skipped frames: {}", p.get_skipped().len())?;
    for (id, reason) in p.get_skipped() {
        writeln!(w, "{S4}{S4}{id}: {reason}")?;
    }
    for (pipeline, n) in p.get_particles() {
        writeln!(w, "{S4}Particles `{pipeline}`: {n}")?;
    }
    for (candidate, n) in p.get_matches() {
        writeln!(w, "{S4}Matches with `{candidate}`: {n}")?;
    }
    if !p.get_join_misses().is_empty() {
        writeln!(w, "{S4}Taxonomy join misses: {}", p.get_join_misses().len())?;
        for miss in p.get_join_misses() {
            writeln!(w, "{S4}{S4}{miss}")?;
        }
    }
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    writeln!(
        w,
        "{S4}Average time: {} us per frame",
        f64_to_display(p.get_avg_frame_time_us())
    )?;
    match p.get_most_time_consuming() {
        Some((id, d)) => write!(w, "{S4}Most time-consuming frame `{id}` costs {} us", d.as_micros())?,
        None => write!(w, "{S4}Most time-consuming frame: /")?,
    }
    Ok(())
}

/// 一次批处理的最终结果.
pub struct RunResult {
    name: &'static str,
    profile: Profile,
    written: Vec<PathBuf>,
}

impl RunResult {
    /// 初始化. `written` 为写出的文件或目录.
    pub fn new(name: &'static str, profile: Profile, written: Vec<PathBuf>) -> Self {
        Self {
            name,
            profile,
            written,
        }
    }

    /// 运行统计.
    #[inline]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// 将结果写进 `w` 中.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        describe_into(self.name, &self.profile, w)?;
        for path in self.written.iter() {
            write!(w, "\n    Written: {}", path.display())?;
        }
        Ok(())
    }

    /// 分析运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        let mut buf = Vec::with_capacity(512);
        self.describe_into(&mut buf)?;
        utils::sep();
        println!("{}", String::from_utf8_lossy(&buf));
        utils::sep();
        Ok(())
    }
}
