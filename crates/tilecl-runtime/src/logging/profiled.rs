use core::{fmt::Display, time::Duration};
use hashbrown::HashMap;

/// Accumulated device time per kernel.
#[derive(Debug, Default)]
pub struct Profiled {
    kernels: HashMap<String, KernelTime>,
}

#[derive(Debug, Default, Clone, Copy)]
struct KernelTime {
    total: Duration,
    launches: u32,
}

impl KernelTime {
    fn mean(&self) -> Duration {
        match self.launches {
            0 => Duration::ZERO,
            launches => self.total / launches,
        }
    }
}

impl Profiled {
    /// If no launch was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Record one launch of the named kernel. Only the first line of the name is kept.
    pub fn update(&mut self, name: &str, duration: Duration) {
        let name = name.lines().next().unwrap_or(name);
        let time = self.kernels.entry_ref(name).or_default();

        time.total += duration;
        time.launches += 1;
    }

    /// Total device time and launch count of the named kernel.
    pub fn get(&self, name: &str) -> Option<(Duration, u32)> {
        self.kernels
            .get(name)
            .map(|time| (time.total, time.launches))
    }

    fn rows(&self) -> Vec<[String; 5]> {
        let total = self.kernels.values().map(|time| time.total).sum::<Duration>();
        let share = |duration: Duration| match total.as_nanos() {
            // Launches can be reported with a zero-length interval.
            0 => 0,
            total => 100 * duration.as_nanos() / total,
        };

        let mut kernels = self.kernels.iter().collect::<Vec<_>>();
        kernels.sort_by(|(name_a, a), (name_b, b)| {
            b.total.cmp(&a.total).then_with(|| name_a.cmp(name_b))
        });

        let mut rows = kernels
            .into_iter()
            .map(|(name, time)| {
                [
                    name.clone(),
                    time.launches.to_string(),
                    format!("{:?}", time.total),
                    format!("{:?}", time.mean()),
                    format!("{} %", share(time.total)),
                ]
            })
            .collect::<Vec<_>>();

        let launches = self.kernels.values().map(|time| time.launches).sum::<u32>();
        let overall = KernelTime { total, launches };
        rows.push([
            "Total".to_string(),
            launches.to_string(),
            format!("{total:?}"),
            format!("{:?}", overall.mean()),
            "100 %".to_string(),
        ]);

        rows
    }
}

const HEADER: [&str; 5] = ["Kernel", "Launches", "Total", "Mean", "Share"];

impl Display for Profiled {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let rows = self.rows();

        let mut widths = HEADER.map(|title| title.chars().count());
        for row in rows.iter() {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let separator = |f: &mut core::fmt::Formatter<'_>| {
            let segments = widths.map(|width| "-".repeat(width + 2));
            writeln!(f, "+{}+", segments.join("+"))
        };
        let line = |f: &mut core::fmt::Formatter<'_>, cells: [&str; 5]| {
            write!(f, "|")?;
            for (cell, width) in cells.iter().zip(widths) {
                write!(f, " {cell:<width$} |")?;
            }
            writeln!(f)
        };

        separator(f)?;
        line(f, HEADER)?;
        separator(f)?;

        let (total, kernels) = rows.split_last().ok_or(core::fmt::Error)?;
        for row in kernels {
            line(f, row.each_ref().map(String::as_str))?;
        }

        separator(f)?;
        line(f, total.each_ref().map(String::as_str))?;
        separator(f)
    }
}
