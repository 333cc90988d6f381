use bioevolve_data::{BodyPlan, DevelopmentalAxis, NeuralTier, PhenotypeClass};

/// Open architect switches per developmental axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchCounts {
    pub multicellularity: usize,
    pub neural: usize,
}

impl SwitchCounts {
    pub fn open(&mut self, axis: DevelopmentalAxis) {
        match axis {
            DevelopmentalAxis::Multicellularity => self.multicellularity += 1,
            DevelopmentalAxis::Neural => self.neural += 1,
        }
    }

    /// Closed phenotype class reached with these switches.
    #[must_use]
    pub fn classify(&self) -> PhenotypeClass {
        let body_plan = BodyPlan::from_switches(self.multicellularity);
        // A nervous system needs more than one cell.
        let neural_tier = if body_plan == BodyPlan::Unicellular {
            NeuralTier::None
        } else {
            NeuralTier::from_switches(self.neural)
        };
        PhenotypeClass {
            body_plan,
            neural_tier,
        }
    }
}

/// Any change of body plan or neural tier.
#[must_use]
pub fn is_major_transition(from: PhenotypeClass, to: PhenotypeClass) -> bool {
    from != to
}
