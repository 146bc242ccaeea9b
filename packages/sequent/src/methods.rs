/// Queued operations, barriers and context switches shared by [`Chain`] and
/// [`ChainAll`]. `$single` is what single-result context switches return.
///
/// [`Chain`]: crate::Chain
/// [`ChainAll`]: crate::ChainAll
macro_rules! chain_methods {
    ($proxy:ident, $single:ident) => {
        impl $proxy {
            fn push(&self, op: $crate::op::Op) -> &Self {
                ::tracing::trace!(?op, "queued");
                self.binding.dispatch($crate::binding::Command::Apply(op));
                self
            }

            fn switch(
                &self,
                operation: &'static str,
                step: impl FnOnce() -> $crate::Result<$crate::traverse::Step>,
            ) -> $crate::Result<::std::rc::Rc<$crate::binding::Binding>> {
                if self.binding.is_fixed() {
                    return Err($crate::ChainError::ImmutableTarget { operation });
                }
                let step = step()?;
                let sink = $crate::binding::Binding::pending(false);
                ::tracing::debug!(operation, "context switch queued");
                self.binding.dispatch($crate::binding::Command::Traverse {
                    step,
                    sink: ::std::rc::Rc::clone(&sink),
                });
                Ok(sink)
            }

            /// `true` when constructed with `fixed`; context switches then fail.
            pub fn is_fixed(&self) -> bool {
                self.binding.is_fixed()
            }

            /// `false` until the context switch that produced this chain has run.
            pub fn is_resolved(&self) -> bool {
                self.binding.is_resolved()
            }

            pub fn set_attribute(&self, name: &str, value: impl ToString) -> &Self {
                self.push($crate::op::Op::SetAttribute(name.to_string(), value.to_string()))
            }

            pub fn remove_attribute(&self, name: &str) -> &Self {
                self.push($crate::op::Op::RemoveAttribute(name.to_string()))
            }

            pub fn toggle_attribute(&self, name: &str, force: Option<bool>) -> &Self {
                self.push($crate::op::Op::ToggleAttribute(name.to_string(), force))
            }

            pub fn add_class(&self, class: &str) -> &Self {
                self.push($crate::op::Op::AddClass(class.to_string()))
            }

            pub fn remove_class(&self, class: &str) -> &Self {
                self.push($crate::op::Op::RemoveClass(class.to_string()))
            }

            pub fn toggle_class(&self, class: &str, force: Option<bool>) -> &Self {
                self.push($crate::op::Op::ToggleClass(class.to_string(), force))
            }

            /// Sets one inline style property; an empty value removes it.
            pub fn css(&self, property: &str, value: impl ToString) -> &Self {
                self.push($crate::op::Op::Css(property.to_string(), value.to_string()))
            }

            pub fn text(&self, text: impl ToString) -> &Self {
                self.push($crate::op::Op::Text(text.to_string()))
            }

            /// Replaces the children with parsed, unsanitized markup.
            pub fn html(&self, html: impl Into<String>) -> &Self {
                self.push($crate::op::Op::Html(html.into()))
            }

            /// Replaces the children with `html` cleaned under `config`.
            pub fn sanitize(&self, html: impl Into<String>, config: ::sequent_dom::SanitizeConfig) -> &Self {
                self.push($crate::op::Op::Sanitize(html.into(), ::std::rc::Rc::new(config)))
            }

            pub fn append(&self, content: impl Into<$crate::Content>) -> &Self {
                self.push($crate::op::Op::Insert($crate::op::Placement::Append, content.into()))
            }

            pub fn prepend(&self, content: impl Into<$crate::Content>) -> &Self {
                self.push($crate::op::Op::Insert($crate::op::Placement::Prepend, content.into()))
            }

            pub fn before(&self, content: impl Into<$crate::Content>) -> &Self {
                self.push($crate::op::Op::Insert($crate::op::Placement::Before, content.into()))
            }

            pub fn after(&self, content: impl Into<$crate::Content>) -> &Self {
                self.push($crate::op::Op::Insert($crate::op::Placement::After, content.into()))
            }

            /// Detaches every member. Handles stay usable.
            pub fn remove(&self) -> &Self {
                self.push($crate::op::Op::Remove)
            }

            /// Replaces each member with an entry of `replacements`, following
            /// `options`. The chain keeps pointing at the replaced members.
            pub fn become_with(
                &self,
                replacements: impl IntoIterator<Item = ::sequent_dom::Element>,
                options: $crate::BecomeOptions,
            ) -> &Self {
                let replacements: ::std::rc::Rc<[::sequent_dom::Element]> =
                    replacements.into_iter().collect();
                self.push($crate::op::Op::Become(replacements, options))
            }

            /// Suspends this chain's queues for `duration`. Other queues keep running.
            pub fn wait(&self, duration: ::std::time::Duration) -> &Self {
                self.push($crate::op::Op::Wait(duration))
            }

            pub fn run(
                &self,
                callback: impl Fn(&::sequent_dom::Element) -> ::sequent_scheduler::TaskResult + 'static,
            ) -> &Self {
                self.push($crate::op::Op::Run(::std::rc::Rc::new(callback)))
            }

            /// Runs `callback` and holds the queue until its future settles.
            pub fn run_async<F, Fut>(&self, callback: F) -> &Self
            where
                F: Fn(::sequent_dom::Element) -> Fut + 'static,
                Fut: ::std::future::Future<Output = ::sequent_scheduler::TaskResult> + 'static,
            {
                use ::futures::future::FutureExt;
                self.push($crate::op::Op::RunAsync(::std::rc::Rc::new(move |el: ::sequent_dom::Element| {
                    callback(el).boxed_local()
                })))
            }

            /// Runs a callback-style function and holds the queue until it
            /// settles or `timeout` elapses. See [`normalize`](crate::normalize).
            pub fn promisify(
                &self,
                callback: impl Fn(::sequent_dom::Element, ::sequent_scheduler::Settle<()>) -> ::sequent_scheduler::TaskResult
                    + 'static,
                timeout: Option<::std::time::Duration>,
                meta: ::sequent_scheduler::Meta,
            ) -> &Self {
                self.push($crate::op::Op::Promisify(::std::rc::Rc::new(callback), timeout, meta))
            }

            pub fn on(&self, event: &str, handler: impl Fn(&::sequent_dom::Event) + 'static) -> &Self {
                self.push($crate::op::Op::On(event.to_string(), ::std::rc::Rc::new(handler)))
            }

            pub fn off(&self, event: &str) -> &Self {
                self.push($crate::op::Op::Off(event.to_string()))
            }

            pub fn trigger(&self, event: &str) -> &Self {
                self.push($crate::op::Op::Trigger(event.to_string(), None))
            }

            pub fn trigger_with(&self, event: &str, detail: impl Into<String>) -> &Self {
                self.push($crate::op::Op::Trigger(event.to_string(), Some(detail.into())))
            }

            /// Runs `callback` for each member as a task of its own: after every
            /// task queued on that member so far, before any queued later.
            pub fn defer(
                &self,
                callback: impl Fn(&::sequent_dom::Element) -> ::sequent_scheduler::TaskResult + 'static,
            ) -> &Self {
                self.binding
                    .dispatch($crate::binding::Command::Defer(::std::rc::Rc::new(callback)));
                self
            }

            /// Resolves once every task queued on this chain so far has finished.
            pub fn settled(&self) -> impl ::std::future::Future<Output = ()> + 'static {
                let (done, wait) = ::tokio::sync::oneshot::channel();
                self.binding.dispatch($crate::binding::Command::Settled(done));
                async move {
                    let _ = wait.await;
                }
            }

            pub fn parent(&self) -> $crate::Result<$single> {
                self.switch("parent", || Ok($crate::traverse::Step::Parent))
                    .map($single::from_binding)
            }

            pub fn next(&self) -> $crate::Result<$single> {
                self.switch("next", || Ok($crate::traverse::Step::Next))
                    .map($single::from_binding)
            }

            pub fn prev(&self) -> $crate::Result<$single> {
                self.switch("prev", || Ok($crate::traverse::Step::Prev))
                    .map($single::from_binding)
            }

            pub fn first(&self) -> $crate::Result<$single> {
                self.switch("first", || Ok($crate::traverse::Step::First))
                    .map($single::from_binding)
            }

            pub fn last(&self) -> $crate::Result<$single> {
                self.switch("last", || Ok($crate::traverse::Step::Last))
                    .map($single::from_binding)
            }

            /// Nearest inclusive ancestor matching `selector`.
            pub fn closest(&self, selector: &str) -> $crate::Result<$single> {
                self.switch("closest", || {
                    $crate::traverse::Step::with_selector($crate::traverse::Step::Closest, selector)
                })
                .map($single::from_binding)
            }

            /// First descendant matching `selector`.
            pub fn pick(&self, selector: &str) -> $crate::Result<$single> {
                self.switch("pick", || {
                    $crate::traverse::Step::with_selector($crate::traverse::Step::Pick, selector)
                })
                .map($single::from_binding)
            }

            /// Element children.
            pub fn kids(&self) -> $crate::Result<$crate::ChainAll> {
                self.switch("kids", || Ok($crate::traverse::Step::Kids))
                    .map($crate::ChainAll::from_binding)
            }

            pub fn siblings(&self) -> $crate::Result<$crate::ChainAll> {
                self.switch("siblings", || Ok($crate::traverse::Step::Siblings))
                    .map($crate::ChainAll::from_binding)
            }

            /// Every descendant matching `selector`.
            pub fn pick_all(&self, selector: &str) -> $crate::Result<$crate::ChainAll> {
                self.switch("pick_all", || {
                    $crate::traverse::Step::with_selector($crate::traverse::Step::PickAll, selector)
                })
                .map($crate::ChainAll::from_binding)
            }
        }
    };
}
