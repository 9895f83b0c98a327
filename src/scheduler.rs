use std::fmt;
use clap::ValueEnum;

use crate::compose::{Composer, pbs::PbsComposer, slurm::SlurmComposer};

/// Batch scheduler family that jobs are submitted to
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Scheduler {
    Slurm,
    Pbs
}

impl fmt::Display for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scheduler::Slurm => write!(f, "slurm"),
            Scheduler::Pbs => write!(f, "pbs")
        }
    }
}

impl Scheduler {
    /// Prefix of in-script scheduler directives (kept in the script header)
    pub fn directive(&self) -> &'static str {
        match self {
            Scheduler::Slurm => "#SBATCH",
            Scheduler::Pbs => "#PBS"
        }
    }

    /// Shell reference to the job id, expanded when the job runs
    pub fn job_id_var(&self) -> &'static str {
        match self {
            Scheduler::Slurm => "${SLURM_JOBID}",
            Scheduler::Pbs => "${PBS_JOBID}"
        }
    }

    /// Shell reference to the array task index, expanded when the job runs
    pub fn task_id_var(&self) -> &'static str {
        match self {
            Scheduler::Slurm => "${SLURM_ARRAY_TASK_ID}",
            Scheduler::Pbs => "${PBS_ARRAYID}"
        }
    }

    /// Per-user options file, relative to the home directory
    pub fn conf_file(&self) -> &'static str {
        match self {
            Scheduler::Slurm => ".sbatchrc",
            Scheduler::Pbs => ".qsubrc"
        }
    }

    pub fn composer(&self) -> Box<dyn Composer> {
        match self {
            Scheduler::Slurm => Box::new(SlurmComposer),
            Scheduler::Pbs => Box::new(PbsComposer)
        }
    }
}
