//! The optimization loop.
//!
//! [`AntColony`] owns one run: it generates the graph, seeds the ants and the
//! pheromone matrix on [`AntColony::initialize`], then iterates on a dedicated
//! worker thread after [`AntColony::start`]. Each iteration rebuilds every
//! ant's trail, updates the pheromones and publishes a `NewBest` event when a
//! strictly shorter tour shows up.
//!
//! State machine: `Uninitialized -> Initialized -> Running -> {Stopped | Completed | Aborted}`.
//! A finished engine may be initialized again for a new run.

use crate::colony::{AntPopulation, PheromoneMatrix, TourConstructor};
use crate::config::RunParameters;
use crate::error::{AcoError, AcoResult};
use crate::events::{ColonyEvent, EventBus, RunSink, SubscriberId, Subscription};
use crate::instance::DistanceMatrix;
use crate::solution::Tour;
use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Lifecycle state of an [`AntColony`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
    Completed,
    Aborted,
}

impl EngineState {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            EngineState::Stopped | EngineState::Completed | EngineState::Aborted
        )
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initialized => "initialized",
            EngineState::Running => "running",
            EngineState::Stopped => "stopped",
            EngineState::Completed => "completed",
            EngineState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation flag, checked at the top of every iteration
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request cancellation. Safe from any thread and idempotent.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Shortest tour seen so far in a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestTrailRecord {
    pub tour: Tour,
    pub length: f64,
    /// `None` for the best of the initial random ants
    pub iteration: Option<usize>,
    pub elapsed_ms: u64,
}

/// Returned by [`AntColony::initialize`]
#[derive(Debug, Clone)]
pub struct InitializationResult {
    pub distances: DistanceMatrix,
    pub initial_ants: Vec<Tour>,
    pub initial_best_tour: Tour,
    pub initial_best_length: f64,
}

/// Final report of a run that ended normally or was stopped
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub state: EngineState,
    pub parameters: RunParameters,
    pub best: BestTrailRecord,
    pub initial_best_length: f64,
    pub iterations: usize,
    pub elapsed_ms: u64,
    pub improvements: Vec<BestTrailRecord>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip)]
    pub distances: DistanceMatrix,
    #[serde(skip)]
    pub pheromones: PheromoneMatrix,
}

/// Everything the worker owns for the duration of a run
struct RunState {
    params: RunParameters,
    distances: DistanceMatrix,
    pheromones: PheromoneMatrix,
    population: AntPopulation,
    rng: ChaCha8Rng,
    best: BestTrailRecord,
}

/// Ant Colony Optimization engine for one TSP run at a time
pub struct AntColony {
    state: Arc<Mutex<EngineState>>,
    pending: Option<RunState>,
    worker: Option<JoinHandle<AcoResult<RunOutcome>>>,
    stop: StopHandle,
    events: EventBus,
    sink: RunSink,
}

impl Default for AntColony {
    fn default() -> Self {
        Self::new()
    }
}

impl AntColony {
    pub fn new() -> Self {
        let events = EventBus::new();
        let sink = events.run_sink();
        AntColony {
            state: Arc::new(Mutex::new(EngineState::Uninitialized)),
            pending: None,
            worker: None,
            stop: StopHandle::default(),
            events,
            sink,
        }
    }

    pub fn state(&self) -> EngineState {
        read_state(&self.state)
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Handle for requesting cancellation from another thread.
    /// Each call to [`AntColony::initialize`] issues a fresh handle.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request cancellation of the current run.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Generate the graph, seed the ants and the pheromone matrix.
    ///
    /// Publishes [`ColonyEvent::Initialized`]. Fails with a configuration
    /// error before touching any state if `params` is invalid.
    pub fn initialize(&mut self, params: RunParameters) -> AcoResult<InitializationResult> {
        let state = self.state();
        if state == EngineState::Running {
            return Err(AcoError::InvalidState {
                operation: "initialize",
                state: state.to_string(),
            });
        }
        params.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let distances = DistanceMatrix::generate(
            params.num_cities,
            params.scatter_start,
            params.scatter_end,
            &mut rng,
        )?;
        let population = AntPopulation::init(params.num_ants, params.num_cities, &mut rng);
        let pheromones = PheromoneMatrix::new(params.num_cities);

        let (best_tour, best_length) = population
            .best_trail(&distances)
            .ok_or_else(|| AcoError::config("num_ants must be positive"))?;

        log::info!(
            "Initialized {} cities, {} ants, seed {}; initial best length {:.1}",
            params.num_cities,
            params.num_ants,
            params.seed,
            best_length
        );

        let result = InitializationResult {
            distances: distances.clone(),
            initial_ants: population.ants().to_vec(),
            initial_best_tour: best_tour.clone(),
            initial_best_length: best_length,
        };

        // Whatever the previous run still has in flight stays with it
        self.sink.close();
        self.sink = self.events.run_sink();
        self.sink.publish(ColonyEvent::Initialized {
            distances: distances.clone(),
            best_tour: best_tour.clone(),
            best_length,
        });

        self.pending = Some(RunState {
            params,
            distances,
            pheromones,
            population,
            rng,
            best: BestTrailRecord {
                tour: best_tour,
                length: best_length,
                iteration: None,
                elapsed_ms: 0,
            },
        });
        self.worker = None;
        self.stop = StopHandle::default();
        self.state = Arc::new(Mutex::new(EngineState::Initialized));

        Ok(result)
    }

    /// Launch the iteration loop on a worker thread. Does not block.
    pub fn start(&mut self) -> AcoResult<()> {
        let state = self.state();
        let run = match (state, self.pending.take()) {
            (EngineState::Initialized, Some(run)) => run,
            (_, pending) => {
                self.pending = pending;
                return Err(AcoError::InvalidState {
                    operation: "start",
                    state: state.to_string(),
                });
            }
        };

        write_state(&self.state, EngineState::Running);
        let shared_state = Arc::clone(&self.state);
        let stop = self.stop.clone();
        let events = self.sink.clone();

        let spawned = thread::Builder::new()
            .name("aco-worker".to_string())
            .spawn(move || {
                let result = run_loop(run, &stop, &events);
                let final_state = match &result {
                    Ok(outcome) => outcome.state,
                    Err(_) => EngineState::Aborted,
                };
                write_state(&shared_state, final_state);
                result
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                write_state(&self.state, EngineState::Aborted);
                Err(AcoError::Io(e))
            }
        }
    }

    /// Block until the worker finishes and return its outcome.
    pub fn wait(&mut self) -> AcoResult<RunOutcome> {
        let handle = self.worker.take().ok_or_else(|| AcoError::InvalidState {
            operation: "wait",
            state: self.state().to_string(),
        })?;
        match handle.join() {
            Ok(result) => result,
            Err(_) => {
                write_state(&self.state, EngineState::Aborted);
                Err(AcoError::WorkerPanicked)
            }
        }
    }

    /// Start and block until the run ends.
    pub fn run_to_completion(&mut self) -> AcoResult<RunOutcome> {
        self.start()?;
        self.wait()
    }

    /// Request cancellation, then wait at most `timeout` for the worker.
    ///
    /// If the worker has not acknowledged by then it is detached and
    /// [`AcoError::StopTimeout`] is returned.
    pub fn stop_and_wait(&mut self, timeout: Duration) -> AcoResult<RunOutcome> {
        self.stop();
        let started = Instant::now();
        loop {
            let finished = match &self.worker {
                Some(handle) => handle.is_finished(),
                None => {
                    return Err(AcoError::InvalidState {
                        operation: "stop",
                        state: self.state().to_string(),
                    })
                }
            };
            if finished {
                return self.wait();
            }
            if started.elapsed() >= timeout {
                log::warn!(
                    "Worker did not stop within {} ms, detaching it",
                    timeout.as_millis()
                );
                // The detached worker keeps writing to the old state cell
                // and publishing into a closed sink
                self.sink.close();
                self.worker = None;
                self.state = Arc::new(Mutex::new(EngineState::Stopped));
                return Err(AcoError::StopTimeout {
                    waited_ms: timeout.as_millis(),
                });
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

fn read_state(shared: &Mutex<EngineState>) -> EngineState {
    match shared.lock() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn write_state(shared: &Mutex<EngineState>, state: EngineState) {
    match shared.lock() {
        Ok(mut guard) => *guard = state,
        Err(poisoned) => *poisoned.into_inner() = state,
    }
}

/// The iteration loop executed by the worker.
fn run_loop(mut run: RunState, stop: &StopHandle, events: &RunSink) -> AcoResult<RunOutcome> {
    let timer = Instant::now();
    let params = run.params.clone();
    let initial_best_length = run.best.length;
    let mut improvements = Vec::new();
    let mut attempt = 0;
    let mut stopped = false;

    log::info!(
        "Starting ACO: {} iterations, alpha={}, beta={}, rho={}, q={}",
        params.max_iterations,
        params.alpha,
        params.beta,
        params.rho,
        params.q
    );

    while attempt < params.max_iterations {
        if stop.is_stop_requested() {
            stopped = true;
            break;
        }

        {
            let constructor =
                TourConstructor::new(&run.pheromones, &run.distances, params.alpha, params.beta);
            if let Err(e) = run.population.update(
                &constructor,
                params.num_cities,
                &mut run.rng,
                params.parallel,
            ) {
                log::error!("Aborting run at iteration {}: {}", attempt, e);
                events.publish(ColonyEvent::Aborted {
                    message: e.to_string(),
                });
                return Err(e);
            }
        }

        run.pheromones.update(
            run.population.ants(),
            &run.distances,
            params.rho,
            params.q,
            params.parallel,
        );

        if let Some((tour, length)) = run.population.best_trail(&run.distances) {
            if length < run.best.length {
                let elapsed_ms = timer.elapsed().as_millis() as u64;
                run.best = BestTrailRecord {
                    tour: tour.clone(),
                    length,
                    iteration: Some(attempt),
                    elapsed_ms,
                };
                improvements.push(run.best.clone());
                log::debug!(
                    "New best length {:.1} at iteration {} ({} ms)",
                    length,
                    attempt,
                    elapsed_ms
                );
                events.publish(ColonyEvent::NewBest {
                    length,
                    tour,
                    iteration: attempt,
                    elapsed_ms,
                });
            }
        }

        attempt += 1;
    }

    let elapsed_ms = timer.elapsed().as_millis() as u64;
    let state = if stopped {
        log::info!(
            "Stopped after {} iterations, best length {:.1}",
            attempt,
            run.best.length
        );
        events.publish(ColonyEvent::Stopped {
            length: run.best.length,
            tour: run.best.tour.clone(),
            iterations: attempt,
            elapsed_ms,
        });
        EngineState::Stopped
    } else {
        log::info!(
            "Completed {} iterations in {} ms, best length {:.1}",
            attempt,
            elapsed_ms,
            run.best.length
        );
        events.publish(ColonyEvent::Completed {
            length: run.best.length,
            tour: run.best.tour.clone(),
            elapsed_ms,
        });
        EngineState::Completed
    };

    Ok(RunOutcome {
        state,
        parameters: params,
        best: run.best,
        initial_best_length,
        iterations: attempt,
        elapsed_ms,
        improvements,
        finished_at: Utc::now(),
        distances: run.distances,
        pheromones: run.pheromones,
    })
}
