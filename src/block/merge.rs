//! Run minimisation and merging.

use crate::block::{Block, Chunk, Markup, MarkupComponent, MarkupKind, Run, RunBodyItem};
use crate::classify::{needs_preserve, preserves_space};
use crate::styles::{StyleContext, StyleOptimizer};

/// Revision-session identifiers that no longer describe a merged run.
const MERGED_RUN_ATTRIBUTES: [&str; 3] = ["rsidR", "rsidRPr", "rsidDel"];

impl Block {
    /// Minimises run properties and merges adjacent runs that render the
    /// same, recursing into containers and nested blocks.
    ///
    /// The paragraph's extracted text is unchanged by this.
    pub fn optimize(&mut self, optimizer: &dyn StyleOptimizer) {
        let paragraph_style = self.paragraph_style.clone();
        let context = StyleContext::new(paragraph_style.as_deref()).with_paragraph_level(self.paragraph_level);
        let start = self.content_start();
        let end = self.content_end();
        let inner: Vec<Chunk> = self.chunks.drain(start..end).collect();
        let optimized = optimize_chunks(inner, optimizer, context);
        self.chunks.splice(start..start, optimized);
    }
}

fn optimize_markup(markup: &mut Markup, optimizer: &dyn StyleOptimizer) {
    for component in markup.components_mut() {
        if let MarkupComponent::NestedBlock(nested) = component {
            nested.block.optimize(optimizer);
        }
    }
}

fn minimize_run(run: &mut Run, optimizer: &dyn StyleOptimizer, context: StyleContext<'_>) {
    for item in run.body_mut().iter_mut() {
        if let RunBodyItem::Markup(markup) = item {
            optimize_markup(markup, optimizer);
        }
    }
    if run.properties().is_empty() {
        return;
    }
    let mut minimized = optimizer.minimize(run.properties(), context);
    minimized.omit_if_empty();
    run.set_properties(minimized);
}

fn optimize_chunks(chunks: Vec<Chunk>, optimizer: &dyn StyleOptimizer, context: StyleContext<'_>) -> Vec<Chunk> {
    let mut out: Vec<Chunk> = Vec::with_capacity(chunks.len());
    // Inert markup found right after the last run of `out`, waiting to see
    // whether that run absorbs the next one.
    let mut held: Vec<Chunk> = Vec::new();

    for chunk in chunks {
        match chunk {
            Chunk::Run(mut run) => {
                minimize_run(&mut run, optimizer, context);
                if let Some(Chunk::Run(last)) = out.last_mut()
                    && can_merge(last, &run, optimizer, context)
                {
                    absorb(last, run);
                } else {
                    push_all(&mut out, held.drain(..));
                    out.push(Chunk::Run(run));
                }
            },
            Chunk::Markup(mut markup) => {
                optimize_markup(&mut markup, optimizer);
                if markup.kind().is_relocatable() && matches!(out.last(), Some(Chunk::Run(_))) {
                    held.push(Chunk::Markup(markup));
                } else {
                    push_all(&mut out, held.drain(..));
                    push_markup(&mut out, markup);
                }
            },
            Chunk::Container(mut container) => {
                let inner = std::mem::take(container.chunks_mut());
                *container.chunks_mut() = optimize_chunks(inner, optimizer, context);
                push_all(&mut out, held.drain(..));
                out.push(Chunk::Container(container));
            },
            other => {
                push_all(&mut out, held.drain(..));
                out.push(other);
            },
        }
    }
    push_all(&mut out, held.drain(..));
    out
}

fn push_all(out: &mut Vec<Chunk>, chunks: impl Iterator<Item = Chunk>) {
    for chunk in chunks {
        match chunk {
            Chunk::Markup(markup) => push_markup(out, markup),
            other => out.push(other),
        }
    }
}

/// Appends markup, joining it with a preceding markup chunk of the same kind.
fn push_markup(out: &mut Vec<Chunk>, markup: Markup) {
    let joinable = !matches!(markup.kind(), MarkupKind::Field);
    match out.last_mut() {
        Some(Chunk::Markup(last)) if joinable && last.kind() == markup.kind() => last.append(markup),
        _ => out.push(Chunk::Markup(markup)),
    }
}

fn can_merge(left: &Run, right: &Run, optimizer: &dyn StyleOptimizer, context: StyleContext<'_>) -> bool {
    !left.is_hidden()
        && !right.is_hidden()
        && left.start().name() == right.start().name()
        && left.has_text()
        && right.has_text()
        && !left.has_nested_items()
        && !right.has_nested_items()
        && !left.has_field_markup()
        && !right.has_field_markup()
        && !left.properties().has_comments()
        && !right.properties().has_comments()
        && optimizer.effectively_equal(left.properties(), right.properties(), context)
}

fn absorb(into: &mut Run, run: Run) {
    if run.properties().len() < into.properties().len() {
        into.set_properties(run.properties().clone());
    }
    into.start_mut()
        .remove_attributes(|attr| MERGED_RUN_ATTRIBUTES.contains(&attr.local_name()));

    // Formatting whitespace between the elements of merged runs is not kept.
    into.body_mut().retain(|item| !is_whitespace_item(item));
    let Run { body, .. } = run;
    for item in body {
        match item {
            ref item if is_whitespace_item(item) => {},
            RunBodyItem::Text(next) => {
                if let Some(RunBodyItem::Text(last)) = into.body_mut().last_mut()
                    && last.start.name() == next.start.name()
                {
                    last.append(next);
                    if last.start.prefix() != "a" && needs_preserve(&last.text) && !preserves_space(&last.start) {
                        last.start.set_attribute("xml:space", "preserve");
                    }
                } else {
                    into.body_mut().push(RunBodyItem::Text(next));
                }
            },
            other => into.body_mut().push(other),
        }
    }
}

fn is_whitespace_item(item: &RunBodyItem) -> bool {
    matches!(item, RunBodyItem::Markup(markup) if markup.kind() == MarkupKind::Whitespace)
}
