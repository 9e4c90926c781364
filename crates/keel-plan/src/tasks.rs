//! Per-module task registration and ordering.

use serde::Serialize;

use crate::ordering::OrderGraph;
use crate::plugins::TaskTemplate;

/// A task in a module's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTask {
    pub name: String,
    /// The plugin that registered the task.
    pub plugin: String,
}

/// Tasks registered by the plugins of one module, in registration order.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: Vec<(PlannedTask, TaskTemplate)>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.iter().any(|(t, _)| t.name == name)
    }

    /// Register a task. A name that is already taken gains the extra
    /// constraints instead of a second entry.
    pub fn register(&mut self, plugin: &str, template: &TaskTemplate) {
        if let Some((_, existing)) = self.tasks.iter_mut().find(|(t, _)| t.name == template.name) {
            tracing::debug!("task `{}` re-registered by {plugin}", template.name);
            existing.after.extend(template.after.iter().cloned());
            existing.before.extend(template.before.iter().cloned());
            return;
        }
        self.tasks.push((
            PlannedTask {
                name: template.name.clone(),
                plugin: plugin.to_string(),
            },
            template.clone(),
        ));
    }

    /// Tasks in execution order. Constraints naming a task that was never
    /// registered are ignored; ties keep registration order.
    pub fn order(self) -> miette::Result<Vec<PlannedTask>> {
        let mut graph = OrderGraph::new();
        for (task, _) in &self.tasks {
            graph.add(&task.name);
        }
        for (index, (_, template)) in self.tasks.iter().enumerate() {
            for first in &template.after {
                if let Some(other) = graph.index_of(first) {
                    graph.before(other, index);
                }
            }
            for then in &template.before {
                if let Some(other) = graph.index_of(then) {
                    graph.before(index, other);
                }
            }
        }

        let names = graph.order()?;
        let mut by_name: Vec<Option<PlannedTask>> =
            self.tasks.into_iter().map(|(task, _)| Some(task)).collect();
        Ok(names
            .iter()
            .filter_map(|name| {
                by_name
                    .iter_mut()
                    .find(|slot| slot.as_ref().is_some_and(|t| &t.name == name))
                    .and_then(Option::take)
            })
            .collect())
    }
}
