use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateRoot, DomainError, DomainResult, ProductId};

use crate::line::{CartLine, Product, Stock};

/// Errors raised by cart decisions.
pub type CartError = DomainError;

/// Cart identifier: the name of the slot the cart is persisted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(String);

impl CartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CartId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate root: Cart.
///
/// Lines are kept in insertion order, which is also display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    id: CartId,
    lines: Vec<CartLine>,
    version: u64,
}

impl Cart {
    pub fn empty(id: CartId) -> Self {
        Self {
            id,
            lines: Vec::new(),
            version: 0,
        }
    }

    /// Rebuild a cart from previously persisted lines.
    ///
    /// Rejects input that breaks the cart invariants (duplicate ids,
    /// amounts below one).
    pub fn from_lines(id: CartId, lines: Vec<CartLine>) -> DomainResult<Self> {
        for (idx, line) in lines.iter().enumerate() {
            if line.amount < 1 {
                return Err(DomainError::invariant(format!(
                    "line {idx} (product {}) has amount {}",
                    line.id, line.amount
                )));
            }
            if lines[..idx].iter().any(|other| other.id == line.id) {
                return Err(DomainError::invariant(format!(
                    "product {} appears more than once",
                    line.id
                )));
            }
        }

        Ok(Self {
            id,
            lines,
            version: 0,
        })
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == product_id)
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.line(product_id).is_some()
    }

    /// Quantity currently held for a product (0 when absent).
    pub fn amount_of(&self, product_id: ProductId) -> i64 {
        self.line(product_id).map(|line| line.amount).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line amounts (what a cart badge shows).
    pub fn total_units(&self) -> i64 {
        self.lines.iter().map(|line| line.amount).sum()
    }
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AddProduct.
///
/// `product` is the catalog record; it is only consulted when the cart has no
/// line for `product_id` yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddProduct {
    pub product_id: ProductId,
    pub stock: Stock,
    pub product: Option<Product>,
}

/// Command: RemoveProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveProduct {
    pub product_id: ProductId,
}

/// Command: UpdateProductAmount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    pub amount: i64,
    pub stock: Stock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartCommand {
    AddProduct(AddProduct),
    RemoveProduct(RemoveProduct),
    UpdateProductAmount(UpdateProductAmount),
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub line: CartLine,
}

/// Event: AmountChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountChanged {
    pub product_id: ProductId,
    pub amount: i64,
}

/// Event: LineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemoved {
    pub product_id: ProductId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartEvent {
    LineAdded(LineAdded),
    AmountChanged(AmountChanged),
    LineRemoved(LineRemoved),
}

impl CartEvent {
    /// Stable event name, used in log fields.
    pub fn event_type(&self) -> &'static str {
        match self {
            CartEvent::LineAdded(_) => "cart.line_added",
            CartEvent::AmountChanged(_) => "cart.amount_changed",
            CartEvent::LineRemoved(_) => "cart.line_removed",
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            CartEvent::LineAdded(e) => e.line.id,
            CartEvent::AmountChanged(e) => e.product_id,
            CartEvent::LineRemoved(e) => e.product_id,
        }
    }
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = CartError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            CartEvent::AmountChanged(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.id == e.product_id) {
                    line.amount = e.amount;
                }
            }
            CartEvent::LineRemoved(e) => {
                self.lines.retain(|l| l.id != e.product_id);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddProduct(cmd) => self.handle_add(cmd),
            CartCommand::RemoveProduct(cmd) => self.handle_remove(cmd),
            CartCommand::UpdateProductAmount(cmd) => self.handle_update_amount(cmd),
        }
    }
}

impl Cart {
    fn ensure_stock_matches(product_id: ProductId, stock: &Stock) -> Result<(), CartError> {
        if stock.id != product_id {
            return Err(DomainError::validation(format!(
                "stock reported for product {} while handling product {product_id}",
                stock.id
            )));
        }
        Ok(())
    }

    fn handle_add(&self, cmd: &AddProduct) -> Result<Vec<CartEvent>, CartError> {
        Self::ensure_stock_matches(cmd.product_id, &cmd.stock)?;

        let current = self.amount_of(cmd.product_id);

        if cmd.stock.amount <= 0 {
            return Err(DomainError::out_of_stock(
                cmd.product_id,
                current + 1,
                cmd.stock.amount,
            ));
        }

        if let Some(line) = self.line(cmd.product_id) {
            if cmd.stock.amount <= line.amount {
                return Err(DomainError::out_of_stock(
                    cmd.product_id,
                    line.amount + 1,
                    cmd.stock.amount,
                ));
            }

            return Ok(vec![CartEvent::AmountChanged(AmountChanged {
                product_id: cmd.product_id,
                amount: line.amount + 1,
            })]);
        }

        let product = cmd.product.as_ref().ok_or_else(|| {
            DomainError::validation(format!(
                "catalog record required to add product {}",
                cmd.product_id
            ))
        })?;

        if product.id != cmd.product_id {
            return Err(DomainError::validation(format!(
                "catalog returned product {} for product {}",
                product.id, cmd.product_id
            )));
        }

        Ok(vec![CartEvent::LineAdded(LineAdded {
            line: CartLine::from_product(product.clone()),
        })])
    }

    fn handle_remove(&self, cmd: &RemoveProduct) -> Result<Vec<CartEvent>, CartError> {
        if !self.contains(cmd.product_id) {
            return Err(DomainError::not_found(cmd.product_id));
        }

        Ok(vec![CartEvent::LineRemoved(LineRemoved {
            product_id: cmd.product_id,
        })])
    }

    fn handle_update_amount(
        &self,
        cmd: &UpdateProductAmount,
    ) -> Result<Vec<CartEvent>, CartError> {
        Self::ensure_stock_matches(cmd.product_id, &cmd.stock)?;

        if cmd.stock.amount < cmd.amount {
            return Err(DomainError::out_of_stock(
                cmd.product_id,
                cmd.amount,
                cmd.stock.amount,
            ));
        }

        // Non-positive amounts are ignored rather than treated as removal, and
        // there is nothing to update for a product the cart does not hold.
        if cmd.amount <= 0 || !self.contains(cmd.product_id) {
            return Ok(vec![]);
        }

        Ok(vec![CartEvent::AmountChanged(AmountChanged {
            product_id: cmd.product_id,
            amount: cmd.amount,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::aggregate::execute;

    fn test_cart() -> Cart {
        Cart::empty(CartId::new("test:cart"))
    }

    fn pid(id: i64) -> ProductId {
        ProductId::new(id)
    }

    fn product(id: i64) -> Product {
        Product::new(pid(id))
            .with_field("title", format!("Product {id}"))
            .with_field("price", 100 + id)
    }

    fn add(id: i64, stock: i64) -> CartCommand {
        CartCommand::AddProduct(AddProduct {
            product_id: pid(id),
            stock: Stock::new(pid(id), stock),
            product: Some(product(id)),
        })
    }

    fn update(id: i64, amount: i64, stock: i64) -> CartCommand {
        CartCommand::UpdateProductAmount(UpdateProductAmount {
            product_id: pid(id),
            amount,
            stock: Stock::new(pid(id), stock),
        })
    }

    fn remove(id: i64) -> CartCommand {
        CartCommand::RemoveProduct(RemoveProduct { product_id: pid(id) })
    }

    #[test]
    fn add_new_product_emits_line_added_with_amount_one() {
        let cart = test_cart();

        let events = cart.handle(&add(1, 5)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            CartEvent::LineAdded(e) => {
                assert_eq!(e.line.id, pid(1));
                assert_eq!(e.line.amount, 1);
                assert_eq!(e.line.title(), Some("Product 1"));
            }
            _ => panic!("Expected LineAdded event"),
        }
    }

    #[test]
    fn add_existing_product_increments_amount() {
        let mut cart = test_cart();
        execute(&mut cart, &add(1, 5)).unwrap();
        execute(&mut cart, &add(2, 5)).unwrap();

        let events = execute(&mut cart, &add(1, 5)).unwrap();
        assert_eq!(
            events,
            vec![CartEvent::AmountChanged(AmountChanged {
                product_id: pid(1),
                amount: 2,
            })]
        );
        assert_eq!(cart.amount_of(pid(1)), 2);
        assert_eq!(cart.amount_of(pid(2)), 1);
    }

    #[test]
    fn add_existing_product_does_not_need_catalog_record() {
        let mut cart = test_cart();
        execute(&mut cart, &add(1, 5)).unwrap();

        let cmd = CartCommand::AddProduct(AddProduct {
            product_id: pid(1),
            stock: Stock::new(pid(1), 5),
            product: None,
        });
        execute(&mut cart, &cmd).unwrap();
        assert_eq!(cart.amount_of(pid(1)), 2);
    }

    #[test]
    fn add_with_zero_stock_is_out_of_stock() {
        let cart = test_cart();

        let err = cart.handle(&add(1, 0)).unwrap_err();
        assert_eq!(err, DomainError::out_of_stock(pid(1), 1, 0));
        assert!(err.is_out_of_stock());
    }

    #[test]
    fn add_when_stock_equals_current_amount_is_out_of_stock() {
        let mut cart = test_cart();
        execute(&mut cart, &add(1, 2)).unwrap();
        execute(&mut cart, &add(1, 2)).unwrap();
        assert_eq!(cart.amount_of(pid(1)), 2);

        let before = cart.clone();
        let err = execute(&mut cart, &add(1, 2)).unwrap_err();
        assert_eq!(err, DomainError::out_of_stock(pid(1), 3, 2));
        assert_eq!(cart, before);
    }

    #[test]
    fn add_new_product_without_catalog_record_is_rejected() {
        let cart = test_cart();
        let cmd = CartCommand::AddProduct(AddProduct {
            product_id: pid(1),
            stock: Stock::new(pid(1), 3),
            product: None,
        });

        let err = cart.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("catalog record")));
    }

    #[test]
    fn mismatched_stock_record_is_rejected() {
        let cart = test_cart();
        let cmd = CartCommand::AddProduct(AddProduct {
            product_id: pid(1),
            stock: Stock::new(pid(2), 3),
            product: Some(product(1)),
        });

        let err = cart.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn remove_present_product_removes_only_that_line() {
        let mut cart = test_cart();
        execute(&mut cart, &add(1, 5)).unwrap();
        execute(&mut cart, &add(2, 5)).unwrap();
        execute(&mut cart, &add(3, 5)).unwrap();

        execute(&mut cart, &remove(2)).unwrap();

        let ids: Vec<_> = cart.lines().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![pid(1), pid(3)]);
    }

    #[test]
    fn remove_absent_product_is_not_found() {
        let cart = test_cart();
        let err = cart.handle(&remove(9)).unwrap_err();
        assert_eq!(err, DomainError::NotFound(pid(9)));
    }

    #[test]
    fn update_amount_sets_exact_value() {
        let mut cart = test_cart();
        execute(&mut cart, &add(1, 10)).unwrap();
        execute(&mut cart, &add(2, 10)).unwrap();

        execute(&mut cart, &update(1, 7, 10)).unwrap();
        assert_eq!(cart.amount_of(pid(1)), 7);
        assert_eq!(cart.amount_of(pid(2)), 1);

        execute(&mut cart, &update(1, 10, 10)).unwrap();
        assert_eq!(cart.amount_of(pid(1)), 10);
    }

    #[test]
    fn update_amount_above_stock_is_out_of_stock() {
        let mut cart = test_cart();
        execute(&mut cart, &add(1, 5)).unwrap();

        let err = cart.handle(&update(1, 6, 5)).unwrap_err();
        assert_eq!(err, DomainError::out_of_stock(pid(1), 6, 5));
    }

    #[test]
    fn update_amount_to_zero_or_below_emits_nothing() {
        let mut cart = test_cart();
        execute(&mut cart, &add(1, 5)).unwrap();

        assert!(cart.handle(&update(1, 0, 5)).unwrap().is_empty());
        assert!(cart.handle(&update(1, -3, 5)).unwrap().is_empty());
        assert_eq!(cart.amount_of(pid(1)), 1);
    }

    #[test]
    fn update_amount_for_absent_product_emits_nothing() {
        let mut cart = test_cart();
        execute(&mut cart, &add(1, 5)).unwrap();

        assert!(cart.handle(&update(4, 2, 5)).unwrap().is_empty());
        assert!(!cart.contains(pid(4)));

        // Stock is still checked first.
        let err = cart.handle(&update(4, 6, 5)).unwrap_err();
        assert!(err.is_out_of_stock());
    }

    #[test]
    fn from_lines_rejects_duplicates_and_empty_amounts() {
        let mut line = CartLine::from_product(product(1));

        let dup = Cart::from_lines(CartId::new("c"), vec![line.clone(), line.clone()]);
        assert!(matches!(dup, Err(DomainError::InvariantViolation(_))));

        line.amount = 0;
        let zero = Cart::from_lines(CartId::new("c"), vec![line]);
        assert!(matches!(zero, Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn version_increments_on_apply() {
        let mut cart = test_cart();
        assert_eq!(cart.version(), 0);

        execute(&mut cart, &add(1, 5)).unwrap();
        assert_eq!(cart.version(), 1);

        execute(&mut cart, &add(1, 5)).unwrap();
        assert_eq!(cart.version(), 2);

        // Rejected commands leave the version alone.
        let _ = execute(&mut cart, &remove(99));
        assert_eq!(cart.version(), 2);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let mut cart = test_cart();
        execute(&mut cart, &add(1, 5)).unwrap();
        let before = cart.clone();

        let events1 = cart.handle(&add(1, 5)).unwrap();
        let events2 = cart.handle(&add(1, 5)).unwrap();

        assert_eq!(cart, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn scenario_add_add_overstock_remove() {
        let mut cart = test_cart();

        execute(&mut cart, &add(1, 5)).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.amount_of(pid(1)), 1);

        execute(&mut cart, &add(1, 5)).unwrap();
        assert_eq!(cart.amount_of(pid(1)), 2);

        let err = execute(&mut cart, &update(1, 10, 5)).unwrap_err();
        assert!(err.is_out_of_stock());
        assert_eq!(cart.amount_of(pid(1)), 2);

        execute(&mut cart, &remove(1)).unwrap();
        assert!(cart.is_empty());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add { id: i64, stock: i64 },
            Remove { id: i64 },
            Update { id: i64, amount: i64, stock: i64 },
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1i64..6, -2i64..8).prop_map(|(id, stock)| Op::Add { id, stock }),
                (1i64..6).prop_map(|id| Op::Remove { id }),
                (1i64..6, -3i64..10, -2i64..10)
                    .prop_map(|(id, amount, stock)| Op::Update { id, amount, stock }),
            ]
        }

        fn to_command(op: &Op) -> CartCommand {
            match *op {
                Op::Add { id, stock } => add(id, stock),
                Op::Remove { id } => remove(id),
                Op::Update { id, amount, stock } => update(id, amount, stock),
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: ids stay unique and amounts stay positive whatever is thrown at the cart.
            #[test]
            fn invariants_hold_for_any_command_sequence(ops in prop::collection::vec(op(), 0..40)) {
                let mut cart = test_cart();

                for op in &ops {
                    let before = cart.clone();
                    if execute(&mut cart, &to_command(op)).is_err() {
                        prop_assert_eq!(&cart, &before);
                    }

                    for (idx, line) in cart.lines().iter().enumerate() {
                        prop_assert!(line.amount >= 1);
                        prop_assert!(cart.lines()[..idx].iter().all(|l| l.id != line.id));
                    }
                }

                let rebuilt = Cart::from_lines(cart.id().clone(), cart.lines().to_vec());
                prop_assert!(rebuilt.is_ok());
            }

            /// Property: an accepted add moves the product's amount up by exactly one.
            #[test]
            fn accepted_add_increments_by_one(
                id in 1i64..6,
                stock in 1i64..8,
                warmup in 0usize..6
            ) {
                let mut cart = test_cart();
                for _ in 0..warmup {
                    let _ = execute(&mut cart, &add(id, stock));
                }
                let before = cart.amount_of(pid(id));

                match execute(&mut cart, &add(id, stock)) {
                    Ok(_) => {
                        prop_assert!(before < stock);
                        prop_assert_eq!(cart.amount_of(pid(id)), before + 1);
                    }
                    Err(err) => {
                        prop_assert!(err.is_out_of_stock());
                        prop_assert!(before >= stock);
                    }
                }
            }

            /// Property: apply is deterministic (same events = same final state).
            #[test]
            fn apply_is_deterministic(ops in prop::collection::vec(op(), 0..20)) {
                let mut source = test_cart();
                let mut events = Vec::new();
                for op in &ops {
                    if let Ok(evs) = execute(&mut source, &to_command(op)) {
                        events.extend(evs);
                    }
                }

                let mut replayed = test_cart();
                for ev in &events {
                    replayed.apply(ev);
                }

                prop_assert_eq!(replayed, source);
            }
        }
    }
}
