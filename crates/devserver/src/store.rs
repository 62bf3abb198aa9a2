//! In-memory backing store: products, users and one cart per user.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use common::{CartId, LineId, ProductId, UserId};
use domain::{Cart, CartLine, Condition, Money, Product, ProductStatus, SellerSummary};
use remote::{Role, User};
use thiserror::Error;

/// Errors raised by store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Product {0} is no longer available")]
    ProductUnavailable(ProductId),

    #[error("Cart not found")]
    CartNotFound,

    #[error("Item {0} not in cart")]
    ItemNotFound(ProductId),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Only {available} of {product_id} in stock")]
    InsufficientStock { product_id: ProductId, available: u32 },
}

#[derive(Debug, Clone)]
struct StoredCart {
    id: CartId,
    lines: Vec<CartLine>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    products: HashMap<ProductId, Product>,
    users: HashMap<UserId, User>,
    carts: HashMap<UserId, StoredCart>,
}

impl StoreState {
    fn available_product(&self, product_id: &ProductId) -> Result<&Product, StoreError> {
        let product = self
            .products
            .get(product_id)
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
        match product.status {
            Some(ProductStatus::Sold) | Some(ProductStatus::Inactive) => {
                Err(StoreError::ProductUnavailable(product_id.clone()))
            }
            _ => Ok(product),
        }
    }

    fn check_stock(&self, product_id: &ProductId, quantity: u32) -> Result<(), StoreError> {
        let product = self.available_product(product_id)?;
        if !product.has_stock_for(quantity) {
            return Err(StoreError::InsufficientStock {
                product_id: product_id.clone(),
                available: product.stock,
            });
        }
        Ok(())
    }

    fn cart_mut(&mut self, user_id: &UserId) -> Result<&mut StoredCart, StoreError> {
        self.carts.get_mut(user_id).ok_or(StoreError::CartNotFound)
    }
}

fn to_cart(user_id: &UserId, stored: &StoredCart) -> Cart {
    Cart::new(
        stored.id.clone(),
        user_id.clone(),
        stored.lines.clone(),
        stored.updated_at,
    )
}

/// Thread-safe in-memory store shared by all handlers.
#[derive(Debug, Default)]
pub struct Store {
    state: RwLock<StoreState>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the demo catalog and users.
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        for product in demo_products() {
            store.insert_product(product);
        }
        for user in demo_users() {
            store.insert_user(user);
        }
        store
    }

    pub fn insert_product(&self, product: Product) {
        self.state
            .write()
            .unwrap()
            .products
            .insert(product.id.clone(), product);
    }

    pub fn insert_user(&self, user: User) {
        self.state
            .write()
            .unwrap()
            .users
            .insert(user.id.clone(), user);
    }

    pub fn user(&self, user_id: &UserId) -> Option<User> {
        self.state.read().unwrap().users.get(user_id).cloned()
    }

    pub fn product(&self, product_id: &ProductId) -> Option<Product> {
        self.state.read().unwrap().products.get(product_id).cloned()
    }

    /// All products, ordered by id.
    pub fn products(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .state
            .read()
            .unwrap()
            .products
            .values()
            .cloned()
            .collect();
        products.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        products
    }

    /// The user's cart with product detail embedded, if one exists.
    pub fn cart(&self, user_id: &UserId) -> Option<Cart> {
        let state = self.state.read().unwrap();
        let stored = state.carts.get(user_id)?;
        let mut cart = to_cart(user_id, stored);
        cart.attach_products(&state.products);
        Some(cart)
    }

    /// Adds units of a product, creating the cart on first use.
    pub fn add_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        if quantity == 0 {
            return Err(StoreError::InvalidQuantity);
        }

        let mut state = self.state.write().unwrap();
        let held = state
            .carts
            .get(user_id)
            .and_then(|c| c.lines.iter().find(|l| &l.product_id == product_id))
            .map_or(0, |l| l.quantity);
        // Saturates so an overflowing request fails the stock check.
        state.check_stock(product_id, held.saturating_add(quantity))?;
        let price = state.available_product(product_id)?.price;

        let now = Utc::now();
        let cart = state
            .carts
            .entry(user_id.clone())
            .or_insert_with(|| StoredCart {
                id: CartId::new(format!("cart-{}", uuid::Uuid::new_v4().simple())),
                lines: Vec::new(),
                updated_at: now,
            });

        match cart.lines.iter_mut().find(|l| &l.product_id == product_id) {
            Some(line) => line.quantity += quantity,
            None => cart.lines.push(CartLine::new(
                LineId::new(uuid::Uuid::new_v4().simple().to_string()),
                product_id.clone(),
                quantity,
                price,
            )),
        }
        cart.updated_at = now;
        Ok(())
    }

    /// Sets a line's quantity. Returns the cart without product detail.
    pub fn update_item(
        &self,
        user_id: &UserId,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, StoreError> {
        if quantity == 0 {
            return Err(StoreError::InvalidQuantity);
        }

        let mut state = self.state.write().unwrap();
        state.check_stock(product_id, quantity)?;
        let cart = state.cart_mut(user_id)?;
        if !cart_id.is_empty() && cart_id != &cart.id {
            return Err(StoreError::CartNotFound);
        }

        let line = cart
            .lines
            .iter_mut()
            .find(|l| &l.product_id == product_id)
            .ok_or_else(|| StoreError::ItemNotFound(product_id.clone()))?;
        line.quantity = quantity;
        cart.updated_at = Utc::now();
        Ok(to_cart(user_id, cart))
    }

    /// Removes a product's line. Returns the cart without product detail.
    pub fn remove_item(&self, user_id: &UserId, product_id: &ProductId) -> Result<Cart, StoreError> {
        let mut state = self.state.write().unwrap();
        let cart = state.cart_mut(user_id)?;
        let before = cart.lines.len();
        cart.lines.retain(|l| &l.product_id != product_id);
        if cart.lines.len() == before {
            return Err(StoreError::ItemNotFound(product_id.clone()));
        }
        cart.updated_at = Utc::now();
        Ok(to_cart(user_id, cart))
    }

    /// Empties the cart, keeping its id.
    pub fn clear(&self, user_id: &UserId) -> Result<Cart, StoreError> {
        let mut state = self.state.write().unwrap();
        let cart = state.cart_mut(user_id)?;
        cart.lines.clear();
        cart.updated_at = Utc::now();
        Ok(to_cart(user_id, cart))
    }
}

fn seller(id: &str, name: &str, verified: bool, rating: Option<f32>) -> SellerSummary {
    SellerSummary {
        id: UserId::new(id),
        name: name.to_string(),
        verified,
        rating,
    }
}

#[allow(clippy::too_many_arguments)]
fn listing(
    id: &str,
    title: &str,
    rupees: i64,
    stock: u32,
    category: &str,
    condition: Condition,
    seller: SellerSummary,
    status: ProductStatus,
) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_string(),
        description: None,
        images: vec![format!("/uploads/{id}.jpg")],
        price: Money::from_rupees(rupees),
        stock,
        category: category.to_string(),
        condition,
        seller,
        status: Some(status),
    }
}

/// Demo catalog of a campus marketplace.
pub fn demo_products() -> Vec<Product> {
    let meera = seller("seller-meera", "Meera Iyer", true, Some(4.8));
    let rohan = seller("seller-rohan", "Rohan Das", false, None);
    vec![
        listing(
            "prod-calculator",
            "Casio fx-991EX scientific calculator",
            950,
            2,
            "electronics",
            Condition::Used,
            meera.clone(),
            ProductStatus::Active,
        ),
        listing(
            "prod-drafter",
            "Mini drafter for engineering drawing",
            180,
            5,
            "stationery",
            Condition::Used,
            rohan.clone(),
            ProductStatus::Active,
        ),
        listing(
            "prod-labcoat",
            "Chemistry lab coat (M)",
            250,
            10,
            "clothing",
            Condition::New,
            meera.clone(),
            ProductStatus::Active,
        ),
        listing(
            "prod-notes",
            "Thermodynamics handwritten notes",
            60,
            25,
            "books",
            Condition::Used,
            rohan.clone(),
            ProductStatus::Active,
        ),
        listing(
            "prod-cycle",
            "Hero Sprint bicycle",
            3200,
            0,
            "vehicles",
            Condition::Used,
            rohan,
            ProductStatus::Sold,
        ),
    ]
}

/// Demo accounts; a user's id doubles as their session token.
pub fn demo_users() -> Vec<User> {
    vec![
        User {
            id: UserId::new("user-asha"),
            name: "Asha Rao".to_string(),
            email: "asha.rao@student.nitk.edu.in".to_string(),
            role: Role::User,
            verified: true,
        },
        User {
            id: UserId::new("seller-meera"),
            name: "Meera Iyer".to_string(),
            email: "meera.iyer@student.nitk.edu.in".to_string(),
            role: Role::Seller,
            verified: true,
        },
    ]
}
