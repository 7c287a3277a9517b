//! In-memory [`Database`] used by tests, of this crate and of its dependents.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use common::operations::{
    By, Commit, Delete, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{category, dish, user, Category, Dish, User},
    infra::{database, Database},
};

/// In-memory [`Database`] without isolation: [`Transact`] returns the same
/// storage and [`Commit`] does nothing.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored rows.
    state: Arc<Mutex<State>>,

    /// Whether every operation should fail with
    /// [`database::Error::Unavailable`].
    unavailable: Arc<AtomicBool>,
}

/// Rows stored in a [`Memory`] database.
#[derive(Debug, Default)]
pub struct State {
    /// Stored [`User`]s.
    pub users: Vec<User>,

    /// Stored [`Category`]s.
    pub categories: Vec<Category>,

    /// Stored [`Dish`]es.
    pub dishes: Vec<Dish>,
}

impl Memory {
    /// Creates a new [`Memory`] database seeded with the default
    /// [`Category`]s.
    ///
    /// # Panics
    ///
    /// If the storage lock is poisoned.
    #[must_use]
    pub fn seeded() -> Self {
        let this = Self::default();
        this.state().categories = ["Entrée", "Plat", "Dessert", "Boisson"]
            .into_iter()
            .zip(1..)
            .map(|(name, id)| Category {
                id: category::Id::from(id),
                name: category::Name::new(name).unwrap(),
            })
            .collect();
        this
    }

    /// Makes every following operation fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Locks the stored [`State`].
    ///
    /// # Panics
    ///
    /// If the storage lock is poisoned.
    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Fails if this [`Memory`] database is made unavailable.
    fn check(&self) -> Result<(), Traced<database::Error>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(tracerr::new!(database::Error::Unavailable));
        }
        Ok(())
    }
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.check()
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let id = by.into_inner();
        Ok(self.state().users.iter().find(|u| u.id == id).cloned())
    }
}

impl<'e> Database<Select<By<Option<User>, &'e user::Email>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'e user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let email = by.into_inner();
        Ok(self.state().users.iter().find(|u| &u.email == email).cloned())
    }
}

impl Database<Select<By<Vec<User>, ()>>> for Memory {
    type Ok = Vec<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<User>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        Ok(self.state().users.clone())
    }
}

impl Database<Insert<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        self.state().users.push(user);
        Ok(())
    }
}

impl Database<Update<User>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let mut state = self.state();
        let Some(stored) = state.users.iter_mut().find(|u| u.id == user.id)
        else {
            return Ok(false);
        };
        *stored = User {
            created_at: stored.created_at,
            ..user
        };
        Ok(true)
    }
}

impl Database<Delete<By<User, user::Id>>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let id = by.into_inner();
        let mut state = self.state();
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        Ok(state.users.len() != before)
    }
}

impl Database<Lock<By<User, user::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()
    }
}

impl Database<Select<By<Vec<Category>, ()>>> for Memory {
    type Ok = Vec<Category>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Category>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        Ok(self.state().categories.clone())
    }
}

impl Database<Select<By<Option<Category>, category::Id>>> for Memory {
    type Ok = Option<Category>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Category>, category::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let id = by.into_inner();
        Ok(self.state().categories.iter().find(|c| c.id == id).cloned())
    }
}

impl Database<Insert<By<Category, category::Name>>> for Memory {
    type Ok = Category;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(by): Insert<By<Category, category::Name>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let mut state = self.state();
        let next = state
            .categories
            .iter()
            .map(|c| i32::from(c.id))
            .max()
            .unwrap_or_default()
            + 1;
        let category = Category {
            id: next.into(),
            name: by.into_inner(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }
}

impl Database<Update<Category>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(category): Update<Category>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let mut state = self.state();
        let Some(stored) =
            state.categories.iter_mut().find(|c| c.id == category.id)
        else {
            return Ok(false);
        };
        *stored = category;
        Ok(true)
    }
}

impl Database<Delete<By<Category, category::Id>>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Category, category::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let id = by.into_inner();
        let mut state = self.state();
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        Ok(state.categories.len() != before)
    }
}

impl Database<Select<By<Option<Dish>, dish::Id>>> for Memory {
    type Ok = Option<Dish>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Dish>, dish::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let id = by.into_inner();
        Ok(self.state().dishes.iter().find(|d| d.id == id).cloned())
    }
}

impl Database<Select<By<Vec<Dish>, dish::Filter>>> for Memory {
    type Ok = Vec<Dish>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Dish>, dish::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let dish::Filter { category_id } = by.into_inner();
        Ok(self
            .state()
            .dishes
            .iter()
            .filter(|d| category_id.map_or(true, |c| d.category_id == c))
            .cloned()
            .collect())
    }
}

impl Database<Insert<Dish>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(dish): Insert<Dish>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        self.state().dishes.push(dish);
        Ok(())
    }
}

impl Database<Update<Dish>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(dish): Update<Dish>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let mut state = self.state();
        let Some(stored) = state.dishes.iter_mut().find(|d| d.id == dish.id)
        else {
            return Ok(false);
        };
        *stored = Dish {
            created_at: stored.created_at,
            ..dish
        };
        Ok(true)
    }
}

impl Database<Delete<By<Dish, dish::Id>>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Dish, dish::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check()?;
        let id = by.into_inner();
        let mut state = self.state();
        let before = state.dishes.len();
        state.dishes.retain(|d| d.id != id);
        Ok(state.dishes.len() != before)
    }
}
