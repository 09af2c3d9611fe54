use gridmatch::{Grammar, Grid, Match, MatchData, ParseResultVerbose, WavePass};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(grammar: &Grammar, grid: &Grid, res: &ParseResultVerbose, color: bool) {
    let palette = ansi::Palette::new(color);
    let header = format!("⚙  Matching '{}' on a {}x{} grid", grammar.root().name, grid.width(), grid.height());
    println!("\n{}", palette.bold(palette.paint(header, ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Waves ━━━", ansi::GRAY));
    for wave in &res.details.waves {
        print_wave(wave, &palette);
    }

    println!("\n{}", palette.paint("━━━ Results ━━━", ansi::GRAY));
    if res.results.is_empty() {
        println!("{}", palette.dim("  No root matches"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • A required component had no candidates");
        println!("  • Constraints rejected every combination");
        println!("  • Cell contents did not classify as the expected types");
        println!("\n{}", palette.dim("  Tip: Set GRIDMATCH_LOG=gridmatch=debug to trace each matcher"));
    } else {
        for (idx, m) in res.results.iter().enumerate() {
            print_match(idx, m, &palette);
        }
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Classification: {}",
        palette.paint(format!("{:?}", res.details.total), ansi::GREEN),
        palette.dim(format!("{:?}", res.details.classification)),
    );
    println!();
}

fn print_wave(wave: &WavePass, palette: &ansi::Palette) {
    println!(
        "  {} {} {}",
        palette.paint(format!("Wave {}:", wave.wave), ansi::BLUE),
        if wave.produced > 0 {
            palette.paint(format!("✓ {} matches", wave.produced), ansi::GREEN)
        } else {
            palette.dim(format!("✗ {} matches", wave.produced))
        },
        palette.dim(format!("[{}] {:?}", wave.patterns.join(", "), wave.duration)),
    );
    for sample in wave.samples.iter().take(5) {
        println!(
            "    {} {} {}",
            palette.paint(sample.rect.to_string(), ansi::YELLOW),
            palette.paint(&sample.pattern, ansi::BLUE),
            palette.dim(&sample.preview)
        );
    }
    if wave.samples.len() > 5 {
        println!("    {}", palette.dim(format!("... +{} more", wave.samples.len() - 5)));
    }
}

fn print_match(idx: usize, m: &Match, palette: &ansi::Palette) {
    println!(
        "  {} {} {} {}",
        palette.paint(format!("[{idx}]"), ansi::GRAY),
        palette.bold(palette.paint(&m.pattern, ansi::GREEN)),
        palette.dim("│"),
        palette.paint(format!("{}  p={:.3}", m.rect, m.precision()), ansi::YELLOW),
    );
    print_tree(m, 1, palette);
}

fn print_tree(m: &Match, depth: usize, palette: &ansi::Palette) {
    let indent = "    ".repeat(depth);
    match &m.data {
        MatchData::Cell { .. } => {}
        MatchData::Array { items } => {
            let preview: String = m.text().chars().take(60).collect();
            println!("{indent}{} {}", palette.dim(format!("{} items:", items.len())), palette.paint(preview, ansi::CYAN));
        }
        MatchData::Components { bound, .. } => {
            for (name, child) in bound.iter().flat_map(|(name, members)| members.iter().map(move |m| (name, m))) {
                println!(
                    "{indent}{} {} {}",
                    palette.paint(format!("{name}:"), ansi::BLUE),
                    palette.paint(&child.pattern, ansi::CYAN),
                    palette.dim(format!("{} \"{}\"", child.rect, child.text().chars().take(40).collect::<String>())),
                );
                print_tree(child, depth + 1, palette);
            }
        }
    }
}
