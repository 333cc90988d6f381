use bioevolve_core::phylogeny::{find_adaptive_radiations, PhylogeneticTree};
use bioevolve_core::stats::PopulationStats;
use bioevolve_data::{LineageEvent, LineageEventKind, SpeciationMode};
use bioevolve_io::{load_checkpoint, read_events};
use clap::Parser;
use petgraph::Direction;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Parser, Debug)]
#[command(author, version, about = "Summarize a BioEvolve run", long_about = None)]
struct Args {
    /// Checkpoint file (`.rkyv` or gzip JSON)
    #[arg(short, long)]
    checkpoint: String,

    /// Lineage event log; defaults to the events stored in the checkpoint
    #[arg(short, long)]
    events: Option<String>,

    /// Markdown report destination
    #[arg(short, long, default_value = "report.md")]
    output: String,

    /// Also write the species tree as Graphviz DOT
    #[arg(long)]
    dot: Option<String>,

    /// Generation window for adaptive radiation detection
    #[arg(long, default_value_t = 20)]
    radiation_window: u64,

    /// Speciations from one ancestor needed to call a radiation
    #[arg(long, default_value_t = 3)]
    radiation_branches: usize,

    /// Print the summary as JSON instead of writing a report
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    generation: u64,
    extinct_run: bool,
    species_total: usize,
    species_alive: usize,
    tree_depth: usize,
    living_tips: usize,
    speciations_by_mode: BTreeMap<String, usize>,
    extinctions: usize,
    major_adaptations: usize,
    stats: PopulationStats,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let state = load_checkpoint(&args.checkpoint)?;

    let events: Vec<LineageEvent> = match &args.events {
        Some(path) => read_events(path)?.into_iter().map(|l| l.event).collect(),
        None => state.events.clone(),
    };

    let tree = PhylogeneticTree::build(&state.registry);
    let living_tips = tree
        .graph
        .externals(Direction::Outgoing)
        .filter(|&idx| tree.graph[idx].extinct_at.is_none())
        .count();

    let mut speciations_by_mode: BTreeMap<String, usize> = BTreeMap::new();
    let mut extinctions = 0;
    let mut major_adaptations = 0;
    for event in &events {
        match event.kind {
            LineageEventKind::Speciation { mode } => {
                *speciations_by_mode.entry(format!("{mode:?}")).or_default() += 1;
            }
            LineageEventKind::Extinction => extinctions += 1,
            LineageEventKind::MajorAdaptation { .. } => major_adaptations += 1,
        }
    }

    let summary = Summary {
        generation: state.generation,
        extinct_run: state.extinct,
        species_total: state.registry.len(),
        species_alive: state.registry.extant_count(),
        tree_depth: tree.depth(),
        living_tips,
        speciations_by_mode,
        extinctions,
        major_adaptations,
        stats: PopulationStats::from_population(state.generation, &state.population),
    };

    if let Some(path) = &args.dot {
        std::fs::write(path, tree.to_dot())?;
        println!("Phylogeny written: {}", path);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let radiations =
        find_adaptive_radiations(&events, args.radiation_window, args.radiation_branches);

    let mut report = format!(
        "# BioEvolve Run Report\n\n\
        ## Summary\n\
        - **Generation**: {}{}\n\
        - **Population**: {} (mean fitness {:.3}, max {:.3})\n\
        - **Species**: {} alive of {} ever named\n\
        - **Tree Depth**: {}\n\
        - **Extinctions**: {}\n\
        - **Major Adaptations**: {}\n\n\
        ## Speciation Modes\n",
        summary.generation,
        if summary.extinct_run { " (run ended in extinction)" } else { "" },
        summary.stats.population,
        summary.stats.mean_fitness,
        summary.stats.max_fitness,
        summary.species_alive,
        summary.species_total,
        summary.tree_depth,
        summary.extinctions,
        summary.major_adaptations,
    );
    for (mode, count) in &summary.speciations_by_mode {
        report.push_str(&format!("- {}: {}\n", mode, count));
    }

    report.push_str(&format!("\n## Adaptive Radiations ({})\n", radiations.len()));
    for r in &radiations {
        let name = tree
            .node(r.ancestor)
            .map(|n| n.name.clone())
            .unwrap_or_default();
        report.push_str(&format!(
            "- **{}** ({}): {} branches in generations {}..={}\n",
            name,
            r.ancestor,
            r.branches.len(),
            r.start,
            r.end
        ));
    }

    report.push_str("\n## Living Species\n");
    for species in state.registry.extant() {
        let lineage: Vec<String> = tree
            .lineage(species.id)
            .iter()
            .map(|id| id.to_string())
            .collect();
        let origin = species
            .origin
            .map_or("founder".to_string(), |m: SpeciationMode| format!("{m:?}"));
        report.push_str(&format!(
            "- **{}** ({}): {} members, founded @{} ({}), lineage {}\n",
            species.name,
            species.id,
            species.members.len(),
            species.founded_at,
            origin,
            lineage.join(" <- ")
        ));
    }

    std::fs::write(&args.output, report)?;
    println!("Report generated: {}", args.output);

    Ok(())
}
